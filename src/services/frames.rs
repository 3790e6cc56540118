//! Lyric frames for the video track.
//!
//! A merged timeline becomes a sequence of still frames, one per distinct
//! mix time. The frames are rendered to images, listed in an ffmpeg concat
//! script with their durations, and encoded together with the mixed audio.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::constants::render::FRAME_SIZE;
use crate::error::{Error, Result};
use crate::lyrics::TimelineEntry;

/// One still frame of the lyric video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// When the frame appears, in mix milliseconds.
    pub start_ms: f64,
    /// When the next frame replaces it.
    pub end_ms: f64,
    /// Lines shown, newline-separated. Empty for a blank frame.
    pub text: String,
    /// Translations of the shown lines, if any were available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
}

impl Frame {
    /// How long the frame is on screen.
    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// Whether the frame shows no lyrics.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Text as drawn: original lines, then translations below them.
    pub fn display_text(&self) -> String {
        match &self.translated_text {
            Some(translated) => format!("{}\n\n{translated}", self.text),
            None => self.text.clone(),
        }
    }
}

/// Frames plus the canvas they are drawn on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePlan {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frames in display order.
    pub frames: Vec<Frame>,
}

impl FramePlan {
    /// Plan frames for a merged timeline at the default frame size.
    pub fn new(entries: &[TimelineEntry], tail_hold_ms: f64) -> Self {
        let (width, height) = FRAME_SIZE;
        Self { width, height, frames: plan_frames(entries, tail_hold_ms) }
    }

    /// Total on-screen time of all frames.
    pub fn duration_ms(&self) -> f64 {
        self.frames.iter().map(Frame::duration_ms).sum()
    }
}

/// Turn a mix-ordered timeline into frames.
///
/// Entries sharing a mix time are stacked into one frame. Each frame lasts
/// until the next distinct mix time, the last one for `tail_hold_ms`. When
/// the first line starts after zero a blank frame fills the gap.
pub fn plan_frames(entries: &[TimelineEntry], tail_hold_ms: f64) -> Vec<Frame> {
    let mut groups: Vec<(f64, Vec<&TimelineEntry>)> = Vec::new();
    for entry in entries {
        match groups.last_mut() {
            Some((time, group)) if time.total_cmp(&entry.mix_time_ms).is_eq() => group.push(entry),
            _ => groups.push((entry.mix_time_ms, vec![entry])),
        }
    }

    let Some(&(first_ms, _)) = groups.first() else {
        return Vec::new();
    };

    let mut frames = Vec::with_capacity(groups.len() + 1);
    if first_ms > 0.0 {
        frames.push(Frame { start_ms: 0.0, end_ms: first_ms, text: String::new(), translated_text: None });
    }

    for (i, (start_ms, group)) in groups.iter().enumerate() {
        let end_ms = groups.get(i + 1).map_or(start_ms + tail_hold_ms.max(0.0), |(next, _)| *next);
        let text = group.iter().map(|e| e.text.as_str()).collect::<Vec<_>>().join("\n");
        let translations: Vec<&str> = group.iter().filter_map(|e| e.translated_text.as_deref()).collect();

        frames.push(Frame {
            start_ms: *start_ms,
            end_ms,
            text,
            translated_text: (!translations.is_empty()).then(|| translations.join("\n")),
        });
    }

    frames
}

/// Draws a frame into an image file.
#[async_trait]
pub trait FrameRenderer: Send + Sync {
    /// Render `frame` at `size` (width, height) into `path`.
    async fn render(&self, frame: &Frame, size: (u32, u32), path: &Path) -> Result<()>;

    /// Get the name of this renderer (for debugging/logging).
    fn name(&self) -> &'static str;
}

/// Renders frames with ffmpeg's `drawtext` filter: centered white text on black.
#[derive(Debug, Clone)]
pub struct DrawtextRenderer {
    ffmpeg: String,
    font_size: u32,
}

impl DrawtextRenderer {
    /// Create a renderer using the given ffmpeg executable.
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self { ffmpeg: ffmpeg.into(), font_size: 56 }
    }

    /// Arguments that draw the text stored in `text_file` into `path`.
    ///
    /// `text_file` is a bare file name resolved against the process working
    /// directory, which keeps quotes and colons in the output path out of
    /// the filter string.
    pub fn args(&self, size: (u32, u32), text_file: Option<&str>, path: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("color=c=black:s={}x{}", size.0, size.1),
        ];
        if let Some(text_file) = text_file {
            args.push("-vf".to_string());
            args.push(format!(
                "drawtext=textfile={text_file}:fontcolor=white:fontsize={}:line_spacing=12:x=(w-text_w)/2:y=(h-text_h)/2",
                self.font_size
            ));
        }
        args.extend(["-frames:v".to_string(), "1".to_string(), path.to_string_lossy().into_owned()]);
        args
    }
}

#[async_trait]
impl FrameRenderer for DrawtextRenderer {
    async fn render(&self, frame: &Frame, size: (u32, u32), path: &Path) -> Result<()> {
        let work_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
        let image_name = path
            .file_name()
            .map(Path::new)
            .ok_or_else(|| Error::Render(format!("frame path has no file name: {}", path.display())))?;
        let text_name = if frame.is_blank() {
            None
        } else {
            let text_file = path.with_extension("txt");
            fs_err::write(&text_file, frame.display_text()).map_err(|e| Error::io(e, text_file.clone()))?;
            text_file.file_name().map(|n| n.to_string_lossy().into_owned())
        };

        let output = Command::new(&self.ffmpeg)
            .current_dir(work_dir)
            .args(self.args(size, text_name.as_deref(), image_name))
            .output()
            .await
            .map_err(|e| Error::Render(format!("failed to run {}: {e}", self.ffmpeg)))?;

        if !output.status.success() {
            return Err(Error::Render(format!(
                "drawing {} failed: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).lines().last().unwrap_or_default()
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "DrawtextRenderer"
    }
}

/// File name of frame `index` inside the work directory.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:05}.png")
}

fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

/// Build an ffmpeg concat-demuxer script for rendered frames.
///
/// The last file is listed twice, since the demuxer ignores the duration of
/// the final entry.
pub fn concat_script(frames: &[Frame], paths: &[PathBuf]) -> String {
    let mut script = String::new();
    for (frame, path) in frames.iter().zip(paths) {
        script.push_str(&format!("file '{}'\n", quote_path(path)));
        script.push_str(&format!("duration {:.3}\n", frame.duration_ms() / 1000.0));
    }
    if let Some(last) = paths.get(frames.len().min(paths.len()).saturating_sub(1)) {
        script.push_str(&format!("file '{}'\n", quote_path(last)));
    }
    script
}

/// ffmpeg arguments that encode the frame script and the mixed audio.
pub fn encode_command(script: &Path, audio: &Path, output: &Path) -> Vec<String> {
    let path = |p: &Path| p.to_string_lossy().into_owned();
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        path(script),
        "-i".to_string(),
        path(audio),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-shortest".to_string(),
        path(output),
    ]
}

/// Render every frame into `work_dir` and encode them with `audio`.
pub async fn render_video(
    plan: &FramePlan,
    renderer: &dyn FrameRenderer,
    ffmpeg: &str,
    audio: &Path,
    work_dir: &Path,
    output: &Path,
) -> Result<()> {
    if plan.frames.is_empty() {
        return Err(Error::Render("no frames to encode".to_string()));
    }
    fs_err::create_dir_all(work_dir).map_err(|e| Error::io(e, work_dir.to_path_buf()))?;

    let mut paths = Vec::with_capacity(plan.frames.len());
    for (i, frame) in plan.frames.iter().enumerate() {
        let path = work_dir.join(frame_file_name(i));
        renderer.render(frame, (plan.width, plan.height), &path).await?;
        paths.push(path);
    }
    tracing::info!("Rendered {} frames with {}", paths.len(), renderer.name());

    let script_path = work_dir.join("frames.ffconcat");
    fs_err::write(&script_path, concat_script(&plan.frames, &paths))
        .map_err(|e| Error::io(e, script_path.clone()))?;

    let result = Command::new(ffmpeg)
        .args(encode_command(&script_path, audio, output))
        .output()
        .await
        .map_err(|e| Error::Render(format!("failed to run {ffmpeg}: {e}")))?;

    if !result.status.success() {
        return Err(Error::Render(format!(
            "encoding {} failed: {}",
            output.display(),
            String::from_utf8_lossy(&result.stderr).lines().last().unwrap_or_default()
        )));
    }

    tracing::info!("Encoded video to {}", output.display());
    Ok(())
}
