//! Application error types.
//!
//! Provides unified error handling with actionable context for debugging.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// A structural problem with one segment of a mix request.
///
/// Positions are 1-based so they can be shown to the user as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentIssue {
    /// The request contained no segments at all.
    EmptyMix,
    /// Trim end is not after trim start.
    InvertedTrim {
        /// 1-based position in the mix.
        position: usize,
        /// Trim start in milliseconds.
        start_ms: f64,
        /// Trim end in milliseconds.
        end_ms: f64,
    },
    /// Trim start lies before the beginning of the source.
    NegativeStart {
        /// 1-based position in the mix.
        position: usize,
        /// Trim start in milliseconds.
        start_ms: f64,
    },
    /// Trim end lies past the end of the source.
    PastSourceEnd {
        /// 1-based position in the mix.
        position: usize,
        /// Trim end in milliseconds.
        end_ms: f64,
        /// Known source duration in milliseconds.
        duration_ms: f64,
    },
    /// Playback rate is zero, negative or not finite.
    InvalidSpeed {
        /// 1-based position in the mix.
        position: usize,
        /// The rejected rate.
        speed_rate: f64,
    },
    /// The audio file for the segment does not exist.
    MissingSource {
        /// 1-based position in the mix.
        position: usize,
        /// Path that could not be found.
        path: PathBuf,
    },
    /// Neither a local file nor a download query was given.
    NoAudio {
        /// 1-based position in the mix.
        position: usize,
    },
    /// The source duration was not given and could not be probed.
    UnknownDuration {
        /// 1-based position in the mix.
        position: usize,
        /// What the audio backend reported.
        reason: String,
    },
}

impl fmt::Display for SegmentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMix => write!(f, "the mix has no segments"),
            Self::InvertedTrim { position, start_ms, end_ms } => write!(
                f,
                "segment {position}: trim end ({end_ms} ms) must be after trim start ({start_ms} ms)"
            ),
            Self::NegativeStart { position, start_ms } => {
                write!(f, "segment {position}: trim start ({start_ms} ms) is negative")
            }
            Self::PastSourceEnd { position, end_ms, duration_ms } => write!(
                f,
                "segment {position}: trim end ({end_ms} ms) is past the source end ({duration_ms} ms)"
            ),
            Self::InvalidSpeed { position, speed_rate } => {
                write!(f, "segment {position}: speed rate {speed_rate} must be a positive number")
            }
            Self::MissingSource { position, path } => {
                write!(f, "segment {position}: audio file not found: {}", path.display())
            }
            Self::NoAudio { position } => {
                write!(f, "segment {position}: needs an audio_path or a query")
            }
            Self::UnknownDuration { position, reason } => {
                write!(f, "segment {position}: could not read the source duration: {reason}")
            }
        }
    }
}

/// Application error types with specific context for actionable debugging
#[derive(Debug, Error)]
pub enum Error {
    /// IO error with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// The underlying IO error.
        source: std::io::Error,
        /// File path where the error occurred, if known.
        path: Option<PathBuf>,
    },

    /// One or more segments are structurally invalid; the run is aborted.
    #[error("Invalid segment(s): {}", join_issues(.0))]
    InvalidSegment(Vec<SegmentIssue>),

    /// A lyric line carries a timestamp tag whose numbers cannot be used
    #[error("Malformed lyric timestamp in {line:?}: {message}")]
    MalformedLyricTimestamp {
        /// The offending raw line.
        line: String,
        /// What was wrong with it.
        message: String,
    },

    /// Audio backend failure (probe, trim, mix, export)
    #[error("Audio backend error: {message}")]
    Audio {
        /// Human-readable error description.
        message: String,
        /// Actionable suggestion for resolving the error.
        hint: Option<&'static str>,
    },

    /// Frame rendering or video encoding failure
    #[error("Render failed: {0}")]
    Render(String),

    /// Network error (connection, timeout, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Translation service error with status context
    #[error("Translation error: {message}")]
    Translation {
        /// Human-readable error description.
        message: String,
        /// HTTP status code, if from an HTTP response.
        status: Option<u16>,
    },

    /// Configuration error with guidance
    #[error("Configuration error: {message}. {hint}")]
    Config {
        /// Description of the configuration problem.
        message: String,
        /// Actionable guidance for fixing the issue.
        hint: &'static str,
    },

    /// File parsing error
    #[error("Parse error in {file:?}: {message}")]
    Parse {
        /// File that failed to parse, if known.
        file: Option<PathBuf>,
        /// Description of the parse failure.
        message: String,
    },
}

fn join_issues(issues: &[SegmentIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl Error {
    /// Create an IO error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io { source, path: path.into() }
    }

    /// Create an audio backend error, attaching a hint for common causes
    pub fn audio(message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = if message.contains("No such file") || message.contains("not found") {
            Some("Check that ffmpeg/ffprobe are installed or set MIXSET_FFMPEG / MIXSET_FFPROBE")
        } else {
            None
        };
        Self::Audio { message, hint }
    }

    /// Create a translation error with HTTP status
    pub fn translation_status(message: impl Into<String>, status: u16) -> Self {
        Self::Translation { message: message.into(), status: Some(status) }
    }

    /// Create a config error with actionable hint
    pub fn config(message: impl Into<String>, hint: &'static str) -> Self {
        Self::Config { message: message.into(), hint }
    }

    /// Create a parse error with file context
    pub fn parse(message: impl Into<String>, file: impl Into<Option<PathBuf>>) -> Self {
        Self::Parse { file: file.into(), message: message.into() }
    }

    /// Issues carried by an [`Error::InvalidSegment`], empty for other variants
    pub fn segment_issues(&self) -> &[SegmentIssue] {
        match self {
            Self::InvalidSegment(issues) => issues,
            _ => &[],
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io { source: e, path: None }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(e.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn invalid_segment_lists_every_position() {
        let err = Error::InvalidSegment(vec![
            SegmentIssue::InvertedTrim { position: 1, start_ms: 5000.0, end_ms: 5000.0 },
            SegmentIssue::MissingSource { position: 3, path: PathBuf::from("/tmp/gone.mp3") },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("segment 1"));
        assert!(msg.contains("segment 3"));
        assert_eq!(err.segment_issues().len(), 2);
    }

    #[test]
    fn audio_missing_binary_provides_hint() {
        match Error::audio("ffprobe: No such file or directory") {
            Error::Audio { hint: Some(h), .. } => assert!(h.contains("MIXSET_FFPROBE")),
            other => panic!("Expected Audio error with hint, got {other:?}"),
        }
    }
}
