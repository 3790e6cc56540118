//! Audio backend: source durations and rendering of the composite mix.
//!
//! The engine never touches samples. It asks a backend how long a file is
//! and hands it the placement list to blend and export.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::Config;
use crate::constants::render::{ATEMPO_MAX, ATEMPO_MIN, EXPORT_BITRATE, EXPORT_SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::mix::Placement;

/// Operations the engine needs from an audio toolchain.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Full duration of an audio file in milliseconds.
    async fn probe_duration_ms(&self, path: &Path) -> Result<f64>;

    /// Trim, fade and overlay the placed segments into `output`.
    ///
    /// The tail of each segment fades out and the head of the next fades in
    /// over `crossfade_ms`.
    async fn render_mix(&self, placements: &[Placement], crossfade_ms: f64, output: &Path) -> Result<()>;

    /// Get the name of this backend (for debugging/logging).
    fn name(&self) -> &'static str;
}

/// Backend that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegBackend {
    /// Create a backend using the given executables.
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self { ffmpeg: ffmpeg.into(), ffprobe: ffprobe.into() }
    }

    /// Create a backend from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffmpeg.clone(), config.ffprobe.clone())
    }

    /// Arguments for rendering `placements` into `output`.
    pub fn mix_args(placements: &[Placement], crossfade_ms: f64, output: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];
        for placement in placements {
            args.push("-i".to_string());
            args.push(placement.source_path.to_string_lossy().into_owned());
        }
        args.extend([
            "-filter_complex".to_string(),
            mix_filter_graph(placements, crossfade_ms),
            "-map".to_string(),
            "[mix]".to_string(),
            "-ar".to_string(),
            EXPORT_SAMPLE_RATE.to_string(),
            "-b:a".to_string(),
            EXPORT_BITRATE.to_string(),
            output.to_string_lossy().into_owned(),
        ]);
        args
    }
}

#[async_trait]
impl AudioBackend for FfmpegBackend {
    async fn probe_duration_ms(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .output()
            .await
            .map_err(|e| spawn_error(&self.ffprobe, &e))?;

        if !output.status.success() {
            return Err(Error::audio(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn render_mix(&self, placements: &[Placement], crossfade_ms: f64, output: &Path) -> Result<()> {
        if placements.is_empty() {
            return Err(Error::audio("nothing to mix: no placements"));
        }

        let args = Self::mix_args(placements, crossfade_ms, output);
        tracing::info!("Rendering {} segments into {}", placements.len(), output.display());
        tracing::debug!("Running {} {}", self.ffmpeg, args.join(" "));

        let result = Command::new(&self.ffmpeg)
            .args(&args)
            .output()
            .await
            .map_err(|e| spawn_error(&self.ffmpeg, &e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(Error::audio(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "FfmpegBackend"
    }
}

fn spawn_error(program: &str, e: &std::io::Error) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::audio(format!("{program} not found"))
    } else {
        Error::audio(format!("failed to run {program}: {e}"))
    }
}

/// Parse ffprobe's duration output (seconds) into milliseconds.
pub fn parse_probe_output(stdout: &str) -> Result<f64> {
    let secs: f64 = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse().ok())
        .ok_or_else(|| Error::audio(format!("unreadable duration from ffprobe: {:?}", stdout.trim())))?;

    if !secs.is_finite() || secs <= 0.0 {
        return Err(Error::audio(format!("ffprobe reported a non-positive duration: {secs}")));
    }
    Ok((secs * 1000.0).round())
}

/// Seconds with millisecond precision, as ffmpeg filters expect.
fn secs(ms: f64) -> String {
    format!("{:.3}", ms / 1000.0)
}

/// Split a playback rate into `atempo` factors, each within the 0.5..=100
/// range the filter accepts. Their product is the original rate.
pub fn atempo_chain(rate: f64) -> Vec<f64> {
    let mut factors = Vec::new();
    if !rate.is_finite() || rate <= 0.0 {
        return factors;
    }

    let mut rest = rate;
    while rest < ATEMPO_MIN {
        factors.push(ATEMPO_MIN);
        rest /= ATEMPO_MIN;
    }
    while rest > ATEMPO_MAX {
        factors.push(ATEMPO_MAX);
        rest /= ATEMPO_MAX;
    }
    factors.push(rest);
    factors
}

/// Build the ffmpeg filter graph for a placement list.
///
/// Input `i` is trimmed to its window, re-timed when the speed is not 1,
/// faded in (all but the first) and out (all but the last) over the
/// crossfade, delayed to its mix start, and finally all inputs are summed
/// into the `[mix]` output. Fades never exceed the segment's own length.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn mix_filter_graph(placements: &[Placement], crossfade_ms: f64) -> String {
    let last = placements.len().saturating_sub(1);
    let mut chains = Vec::with_capacity(placements.len() + 1);

    for (i, p) in placements.iter().enumerate() {
        let fade_ms = crossfade_ms.max(0.0).min(p.mix_duration_ms());
        let mut chain = format!(
            "[{i}:a]atrim=start={}:end={},asetpts=PTS-STARTPTS",
            secs(p.source_start_ms),
            secs(p.source_end_ms)
        );
        if p.speed_rate != 1.0 {
            for factor in atempo_chain(p.speed_rate) {
                chain.push_str(&format!(",atempo={factor}"));
            }
        }
        if i > 0 && fade_ms > 0.0 {
            chain.push_str(&format!(",afade=t=in:st=0:d={}", secs(fade_ms)));
        }
        if i < last && fade_ms > 0.0 {
            chain.push_str(&format!(
                ",afade=t=out:st={}:d={}",
                secs(p.mix_duration_ms() - fade_ms),
                secs(fade_ms)
            ));
        }
        let delay = p.mix_start_ms.round().max(0.0) as u64;
        chain.push_str(&format!(",adelay={delay}:all=1[a{i}]"));
        chains.push(chain);
    }

    let labels: String = (0..placements.len()).map(|i| format!("[a{i}]")).collect();
    if placements.len() == 1 {
        chains.push(format!("{labels}anull[mix]"));
    } else {
        chains.push(format!(
            "{labels}amix=inputs={}:duration=longest:normalize=0[mix]",
            placements.len()
        ));
    }

    chains.join(";")
}
