//! Application configuration.
//!
//! Handles loading configuration from environment variables and .env files.

use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

use crate::constants::{mix, render};
use crate::error::Result;

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The application name
    app_name: String,
    /// The application version
    app_version: String,
    /// Crossfade between adjacent segments, in milliseconds
    pub crossfade_ms: f64,
    /// How long the last lyric frame is held, in milliseconds
    pub tail_hold_ms: f64,
    /// Where run outputs (mix, LRC, frame plan) are written
    pub output_dir: PathBuf,
    /// Where downloaded audio is stored
    pub download_dir: PathBuf,
    /// Optional directory of `.lrc` / `.txt` lyric files
    pub lyrics_dir: Option<PathBuf>,
    /// ffmpeg executable
    pub ffmpeg: String,
    /// ffprobe executable
    pub ffprobe: String,
    /// yt-dlp executable
    pub ytdlp: String,
    /// `OpenAI` API key used for translation
    pub openai_api_key: String,
    /// Model used for translation requests
    pub translate_model: String,
    /// Language lyrics are translated into
    pub target_language: String,
}

impl Config {
    /// Get the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get the application version.
    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.app_version
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            crossfade_ms: mix::DEFAULT_CROSSFADE_MS,
            tail_hold_ms: render::DEFAULT_TAIL_HOLD_MS,
            output_dir: PathBuf::from("mixset_output"),
            download_dir: default_download_dir(),
            lyrics_dir: None,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            ytdlp: "yt-dlp".to_string(),
            openai_api_key: String::new(),
            translate_model: "gpt-4o-mini".to_string(),
            target_language: "English".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    #[allow(clippy::unnecessary_wraps)] // Returns Result for forward-compatible API
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();

        let mut config = Self::default();

        if let Some(ms) = env_millis("MIXSET_CROSSFADE_MS") {
            config.crossfade_ms = ms;
        }
        if let Some(ms) = env_millis("MIXSET_TAIL_HOLD_MS") {
            config.tail_hold_ms = ms;
        }

        if let Ok(path) = env::var("MIXSET_OUTPUT_DIR") {
            config.output_dir = expand(&path);
        }
        if let Ok(path) = env::var("MIXSET_DOWNLOAD_DIR") {
            config.download_dir = expand(&path);
        }

        // Lyrics directory only counts if it actually exists
        config.lyrics_dir = env::var("MIXSET_LYRICS_DIR")
            .ok()
            .map(|path| expand(&path))
            .filter(|p| p.is_dir());

        if let Ok(program) = env::var("MIXSET_FFMPEG") {
            config.ffmpeg = program;
        }
        if let Ok(program) = env::var("MIXSET_FFPROBE") {
            config.ffprobe = program;
        }
        if let Ok(program) = env::var("MIXSET_YTDLP") {
            config.ytdlp = program;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config.openai_api_key = key;
        }
        if let Ok(model) = env::var("MIXSET_TRANSLATE_MODEL") {
            config.translate_model = model;
        }
        if let Ok(language) = env::var("MIXSET_TARGET_LANGUAGE") {
            config.target_language = language;
        }

        Ok(config)
    }

    /// Check if a translation backend is configured
    pub fn has_translation_credentials(&self) -> bool {
        !self.openai_api_key.is_empty()
    }
}

/// Read a non-negative millisecond value; anything unparsable keeps the default.
fn env_millis(key: &str) -> Option<f64> {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Default download location: `~/Music/mixset`, or `./downloads` without a home.
fn default_download_dir() -> PathBuf {
    dirs::audio_dir().map_or_else(|| PathBuf::from("downloads"), |d| d.join("mixset"))
}
