//! Audio acquisition for segments that only name a song.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::Config;
use crate::error::{Error, Result};

/// Something that can turn a search query or URL into a local audio file.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Download audio for `query`; returns the file path and the track title.
    async fn fetch_audio(&self, query: &str) -> Result<(PathBuf, String)>;
}

/// Downloads audio with `yt-dlp`, extracting it to mp3.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    program: String,
    download_dir: PathBuf,
}

impl YtDlpSource {
    /// Create a source that stores files in `download_dir`.
    pub fn new(program: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), download_dir: download_dir.into() }
    }

    /// Create a source from config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ytdlp.clone(), config.download_dir.clone())
    }

    /// Arguments for downloading `query`.
    pub fn args(&self, query: &str) -> Vec<String> {
        let template = self.download_dir.join("%(title)s.%(ext)s");
        vec![
            "--no-playlist".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--no-simulate".to_string(),
            "--print".to_string(),
            "title".to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            ytdlp_target(query),
        ]
    }
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn fetch_audio(&self, query: &str) -> Result<(PathBuf, String)> {
        fs_err::create_dir_all(&self.download_dir).map_err(|e| Error::io(e, self.download_dir.clone()))?;
        tracing::info!("Downloading audio for {query:?}");

        let output = Command::new(&self.program)
            .args(self.args(query))
            .output()
            .await
            .map_err(|e| Error::audio(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(Error::audio(format!(
                "{} failed for {query:?}: {}",
                self.program,
                String::from_utf8_lossy(&output.stderr).lines().last().unwrap_or_default()
            )));
        }

        let (path, title) = parse_ytdlp_output(&String::from_utf8_lossy(&output.stdout))?;
        tracing::info!("Downloaded '{title}' to {}", path.display());
        Ok((path, title))
    }
}

/// URLs go to yt-dlp as-is; anything else becomes a single-result search.
pub fn ytdlp_target(query: &str) -> String {
    let query = query.trim();
    if query.starts_with("http://") || query.starts_with("https://") {
        query.to_string()
    } else {
        format!("ytsearch1:{query}")
    }
}

/// Read the title and final file path printed by yt-dlp.
///
/// The title is printed before the download and the path after it, so the
/// first non-empty line is the title and the last is the path.
pub fn parse_ytdlp_output(stdout: &str) -> Result<(PathBuf, String)> {
    let lines: Vec<&str> = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    match lines.as_slice() {
        [title, .., path] => Ok((PathBuf::from(path), (*title).to_string())),
        [path] => {
            let title = Path::new(path).file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
            Ok((PathBuf::from(path), title))
        }
        [] => Err(Error::audio("yt-dlp printed no file path")),
    }
}
