//! Trimmed references to source audio and their structural validation.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::mix::UNITY_SPEED;
use crate::error::{Error, Result, SegmentIssue};
use crate::lyrics::source::infer_mode;
use crate::types::LyricsMode;

/// One trimmed slice of an audio file, plus the lyrics that go with it.
///
/// Segments are plain values: a run receives them by value or slice and
/// never keeps them around afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Display title, used only for logging and reports.
    pub title: String,
    /// Audio file handed to the audio backend.
    pub source_path: PathBuf,
    /// Start of the selected window, in source milliseconds.
    pub trim_start_ms: f64,
    /// End of the selected window, in source milliseconds.
    pub trim_end_ms: f64,
    /// Full duration of the source, when the backend reported one.
    pub source_duration_ms: Option<f64>,
    /// Playback-rate multiplier applied in the mix.
    pub speed_rate: f64,
    /// Position in the mixset; lower plays first.
    pub order: usize,
    /// Raw lyric text as supplied by the caller.
    pub raw_lyrics: String,
    /// How `raw_lyrics` becomes timeline entries.
    pub lyrics_mode: LyricsMode,
}

impl Segment {
    /// Create a segment over `[trim_start_ms, trim_end_ms]` of `source_path`.
    ///
    /// The title defaults to the file stem; there are no lyrics yet.
    pub fn new(source_path: impl Into<PathBuf>, trim_start_ms: f64, trim_end_ms: f64) -> Self {
        let source_path = source_path.into();
        let title = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title,
            source_path,
            trim_start_ms,
            trim_end_ms,
            source_duration_ms: None,
            speed_rate: UNITY_SPEED,
            order: 0,
            raw_lyrics: String::new(),
            lyrics_mode: LyricsMode::Plain,
        }
    }

    /// Attach lyric text and pre-populate the mode by inspecting it.
    #[must_use]
    pub fn with_lyrics(mut self, raw: impl Into<String>) -> Self {
        self.raw_lyrics = raw.into();
        self.lyrics_mode = infer_mode(&self.raw_lyrics);
        self
    }

    /// Override the lyrics mode chosen by inference.
    #[must_use]
    pub fn with_mode(mut self, mode: LyricsMode) -> Self {
        self.lyrics_mode = mode;
        self
    }

    /// Set the mix position.
    #[must_use]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Set the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Record the duration reported by the audio backend.
    #[must_use]
    pub fn with_source_duration(mut self, duration_ms: f64) -> Self {
        self.source_duration_ms = Some(duration_ms);
        self
    }

    /// Set the playback-rate multiplier.
    #[must_use]
    pub fn with_speed_rate(mut self, speed_rate: f64) -> Self {
        self.speed_rate = speed_rate;
        self
    }

    /// Length of the trim window in source milliseconds.
    pub fn trim_span_ms(&self) -> f64 {
        self.trim_end_ms - self.trim_start_ms
    }

    /// Structural problems with this segment's trim window and rate.
    fn issues(&self, position: usize) -> Vec<SegmentIssue> {
        let mut issues = Vec::new();

        if self.trim_start_ms < 0.0 {
            issues.push(SegmentIssue::NegativeStart { position, start_ms: self.trim_start_ms });
        }
        // NaN bounds compare as None and are rejected too
        if self.trim_end_ms.partial_cmp(&self.trim_start_ms) != Some(Ordering::Greater) {
            issues.push(SegmentIssue::InvertedTrim {
                position,
                start_ms: self.trim_start_ms,
                end_ms: self.trim_end_ms,
            });
        }
        if let Some(duration_ms) = self.source_duration_ms {
            if self.trim_end_ms > duration_ms {
                issues.push(SegmentIssue::PastSourceEnd {
                    position,
                    end_ms: self.trim_end_ms,
                    duration_ms,
                });
            }
        }
        if !self.speed_rate.is_finite() || self.speed_rate <= 0.0 {
            issues.push(SegmentIssue::InvalidSpeed { position, speed_rate: self.speed_rate });
        }

        issues
    }
}

/// Segments sorted into mix order. The sort is stable, so equal `order`
/// values keep their insertion order.
pub(crate) fn in_mix_order(segments: &[Segment]) -> Vec<&Segment> {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.order);
    ordered
}

/// Check every segment and report all problems at once, by position.
///
/// An empty list is an error here: callers use this before asking for a mix.
pub fn validate_segments(segments: &[Segment]) -> Result<()> {
    if segments.is_empty() {
        return Err(Error::InvalidSegment(vec![SegmentIssue::EmptyMix]));
    }

    let issues: Vec<SegmentIssue> = in_mix_order(segments)
        .into_iter()
        .enumerate()
        .flat_map(|(idx, segment)| segment.issues(idx + 1))
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidSegment(issues))
    }
}

/// Check that every segment's audio file exists on disk.
pub fn validate_sources(segments: &[Segment]) -> Result<()> {
    let issues: Vec<SegmentIssue> = in_mix_order(segments)
        .into_iter()
        .enumerate()
        .filter(|(_, segment)| !Path::new(&segment.source_path).is_file())
        .map(|(idx, segment)| SegmentIssue::MissingSource {
            position: idx + 1,
            path: segment.source_path.clone(),
        })
        .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidSegment(issues))
    }
}

/// Trim-window issues only, used by the placer.
pub(crate) fn trim_issues(ordered: &[&Segment]) -> Vec<SegmentIssue> {
    ordered
        .iter()
        .enumerate()
        .flat_map(|(idx, segment)| segment.issues(idx + 1))
        .filter(|issue| {
            matches!(issue, SegmentIssue::InvertedTrim { .. } | SegmentIssue::InvalidSpeed { .. })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn with_lyrics_infers_mode() {
        let timed = Segment::new("a.mp3", 0.0, 1000.0).with_lyrics("[00:01.00]Hi");
        assert_eq!(timed.lyrics_mode, LyricsMode::Timed);

        let plain = Segment::new("a.mp3", 0.0, 1000.0).with_lyrics("Hi\nthere");
        assert_eq!(plain.lyrics_mode, LyricsMode::Plain);

        let skipped = Segment::new("a.mp3", 0.0, 1000.0)
            .with_lyrics("[00:01.00]Hi")
            .with_mode(LyricsMode::Skip);
        assert_eq!(skipped.lyrics_mode, LyricsMode::Skip);
    }

    #[test]
    fn title_defaults_to_file_stem() {
        let segment = Segment::new("/music/Artist - Song.mp3", 0.0, 1.0);
        assert_eq!(segment.title, "Artist - Song");
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = validate_segments(&[]).unwrap_err();
        assert_eq!(err.segment_issues(), &[SegmentIssue::EmptyMix]);
    }

    #[test]
    fn reports_every_bad_segment_by_position() {
        let segments = vec![
            Segment::new("a.mp3", 0.0, 10_000.0),
            Segment::new("b.mp3", 5000.0, 5000.0).with_order(1),
            Segment::new("c.mp3", 0.0, 90_000.0).with_order(2).with_source_duration(60_000.0),
        ];

        let err = validate_segments(&segments).unwrap_err();
        let issues = err.segment_issues();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], SegmentIssue::InvertedTrim { position: 2, .. }));
        assert!(matches!(issues[1], SegmentIssue::PastSourceEnd { position: 3, .. }));
    }

    #[test]
    fn positions_follow_mix_order() {
        let segments = vec![
            Segment::new("late.mp3", 0.0, 10_000.0).with_order(5),
            Segment::new("bad.mp3", 3000.0, 1000.0).with_order(9),
            Segment::new("early.mp3", 0.0, 10_000.0).with_order(1),
        ];

        let err = validate_segments(&segments).unwrap_err();
        assert!(matches!(err.segment_issues()[0], SegmentIssue::InvertedTrim { position: 3, .. }));
    }

    #[test]
    fn rejects_non_positive_speed() {
        let segments = vec![Segment::new("a.mp3", 0.0, 1000.0).with_speed_rate(0.0)];
        let err = validate_segments(&segments).unwrap_err();
        assert!(matches!(err.segment_issues()[0], SegmentIssue::InvalidSpeed { position: 1, .. }));
    }

    #[test]
    fn missing_sources_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.mp3");
        std::fs::write(&present, b"id3").unwrap();

        let segments = vec![
            Segment::new(&present, 0.0, 1000.0),
            Segment::new(dir.path().join("absent.mp3"), 0.0, 1000.0).with_order(1),
        ];

        let err = validate_sources(&segments).unwrap_err();
        assert!(matches!(err.segment_issues()[0], SegmentIssue::MissingSource { position: 2, .. }));
    }
}
