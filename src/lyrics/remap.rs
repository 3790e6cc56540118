//! Projection of parsed lyric lines from source time onto mix time.

use serde::{Deserialize, Serialize};

use super::source::{LyricLine, ParsedLyrics};
use crate::constants::mix::MIN_PLAIN_SPAN_MS;
use crate::mix::Placement;

/// A lyric line positioned on the mix time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Position in the composite mix, in milliseconds.
    pub mix_time_ms: f64,
    /// Original-language line.
    pub text: String,
    /// Translation, once a translator has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    /// `order` of the segment the line came from.
    pub segment_index: usize,
}

impl TimelineEntry {
    /// Create an untranslated entry.
    pub fn new(mix_time_ms: f64, text: impl Into<String>, segment_index: usize) -> Self {
        Self { mix_time_ms, text: text.into(), translated_text: None, segment_index }
    }
}

/// Remap timed lines, dropping those outside the trim window.
///
/// Both window bounds are inclusive. Lines without a timestamp are ignored.
pub fn remap_timed(lines: &[LyricLine], placement: &Placement) -> Vec<TimelineEntry> {
    lines
        .iter()
        .filter_map(|line| {
            #[allow(clippy::cast_precision_loss)]
            let source_ms = line.source_time_ms? as f64;
            placement.contains_source(source_ms).then(|| {
                TimelineEntry::new(
                    placement.to_mix_time(source_ms),
                    line.text.clone(),
                    placement.segment_index,
                )
            })
        })
        .collect()
}

/// Spread untimed lines evenly over the trim window, then remap.
///
/// Line `k` of `n` gets source time `start + k * span / n`, so the last line
/// starts one step before the window closes.
pub fn remap_plain(lines: &[LyricLine], placement: &Placement) -> Vec<TimelineEntry> {
    if lines.is_empty() {
        return Vec::new();
    }

    let span = (placement.source_end_ms - placement.source_start_ms).max(MIN_PLAIN_SPAN_MS);
    #[allow(clippy::cast_precision_loss)]
    let step = span / lines.len() as f64;

    lines
        .iter()
        .enumerate()
        .map(|(k, line)| {
            #[allow(clippy::cast_precision_loss)]
            let source_ms = (k as f64).mul_add(step, placement.source_start_ms);
            TimelineEntry::new(placement.to_mix_time(source_ms), line.text.clone(), placement.segment_index)
        })
        .collect()
}

/// Remap whatever the segment's mode produced.
pub fn remap(parsed: &ParsedLyrics, placement: &Placement) -> Vec<TimelineEntry> {
    match parsed {
        ParsedLyrics::Skipped => Vec::new(),
        ParsedLyrics::Timed(lines) => remap_timed(lines, placement),
        ParsedLyrics::Plain(lines) => remap_plain(lines, placement),
    }
}
