//! Core type definitions for compile-time safety.
//!
//! This module provides the closed lyric-mode variant and newtype wrappers
//! around string identifiers handed out by metadata sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a segment's lyric text should be turned into timeline entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricsMode {
    /// Lines carry `[mm:ss.xx]` timestamps in source time.
    Timed,
    /// Untimed lines, spread evenly across the trim window.
    #[default]
    Plain,
    /// The segment contributes no lyrics.
    Skip,
}

impl LyricsMode {
    /// Returns the human-readable name of this mode.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timed => "Timed",
            Self::Plain => "Plain",
            Self::Skip => "Skip",
        }
    }

    /// Whether this mode produces any timeline entries at all.
    #[must_use]
    pub const fn contributes(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for LyricsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier of a track in a metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub String);

impl TrackId {
    /// Create a new `TrackId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn lyrics_mode_serializes_lowercase() {
        let json = serde_json::to_string(&LyricsMode::Skip).unwrap();
        assert_eq!(json, "\"skip\"");
        let mode: LyricsMode = serde_json::from_str("\"timed\"").unwrap();
        assert_eq!(mode, LyricsMode::Timed);
    }

    #[test]
    fn only_skip_contributes_nothing() {
        assert!(LyricsMode::Timed.contributes());
        assert!(LyricsMode::Plain.contributes());
        assert!(!LyricsMode::Skip.contributes());
    }
}
