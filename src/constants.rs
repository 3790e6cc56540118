//! Application constants.
//!
//! Centralizes magic numbers and configuration values for better maintainability.

/// Mix timing constants.
pub mod mix {
    /// Default crossfade between adjacent segments, in milliseconds.
    pub const DEFAULT_CROSSFADE_MS: f64 = 4000.0;

    /// Playback rate used when a segment does not ask for a tempo change.
    pub const UNITY_SPEED: f64 = 1.0;

    /// Lower bound for the synthesized span of plain lyrics, in milliseconds.
    pub const MIN_PLAIN_SPAN_MS: f64 = 1.0;
}

/// Frame and video rendering constants.
pub mod render {
    /// How long the last lyric frame is held after the final line, in milliseconds.
    pub const DEFAULT_TAIL_HOLD_MS: f64 = 5000.0;

    /// Output frame size in pixels (width, height).
    pub const FRAME_SIZE: (u32, u32) = (1920, 1080);

    /// Smallest factor a single ffmpeg `atempo` stage accepts.
    pub const ATEMPO_MIN: f64 = 0.5;

    /// Largest factor a single ffmpeg `atempo` stage accepts.
    pub const ATEMPO_MAX: f64 = 100.0;

    /// Sample rate used when exporting the composite mix.
    pub const EXPORT_SAMPLE_RATE: u32 = 44_100;

    /// Audio bitrate used when exporting the composite mix.
    pub const EXPORT_BITRATE: &str = "192k";
}

/// Translation constants.
pub mod translation {
    /// Prefix the offline marker translator puts in front of each line.
    pub const MARKER_PREFIX: &str = "(Trans) ";

    /// Maximum number of lines translated concurrently.
    pub const MAX_CONCURRENT_REQUESTS: usize = 4;

    /// Timeout for a single translation request, in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    /// Chat completions endpoint used by the `OpenAI` translator.
    pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
}

/// Local lyrics library constants.
pub mod library {
    /// File extensions indexed by the lyrics library.
    pub const LYRICS_EXTENSIONS: &[&str] = &["lrc", "txt"];

    /// Maximum number of search results returned.
    pub const MAX_SEARCH_RESULTS: usize = 10;

    /// Minimum fuzzy score for a title match.
    pub const MIN_FUZZY_SCORE: i64 = 50;
}
