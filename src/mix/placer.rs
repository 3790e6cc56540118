//! Placement of trimmed segments on the mix time axis.
//!
//! Each segment after the first starts one crossfade before the previous
//! segment ends. When an earlier segment is shorter than the crossfade the
//! start is clamped at zero and the overlap shrinks to whatever is available.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::segment::{in_mix_order, trim_issues, Segment};
use crate::error::{Error, Result};

/// Where one segment's trim window lands in the composite mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// The segment's `order` value, for traceability.
    pub segment_index: usize,
    /// Audio file the placement refers to.
    pub source_path: PathBuf,
    /// Trim start in source time.
    pub source_start_ms: f64,
    /// Trim end in source time.
    pub source_end_ms: f64,
    /// Start of the segment in mix time.
    pub mix_start_ms: f64,
    /// End of the segment in mix time.
    pub mix_end_ms: f64,
    /// Playback-rate multiplier.
    pub speed_rate: f64,
}

impl Placement {
    /// Project a source timestamp onto the mix time axis.
    ///
    /// Re-bases to zero at the trim start, scales by the inverse speed,
    /// then offsets by the segment's mix start.
    pub fn to_mix_time(&self, source_ms: f64) -> f64 {
        (source_ms - self.source_start_ms) / self.speed_rate + self.mix_start_ms
    }

    /// Whether a source timestamp falls inside the trim window (inclusive).
    pub fn contains_source(&self, source_ms: f64) -> bool {
        (self.source_start_ms..=self.source_end_ms).contains(&source_ms)
    }

    /// Audible length of the segment in the mix.
    pub fn mix_duration_ms(&self) -> f64 {
        self.mix_end_ms - self.mix_start_ms
    }

    /// How long this placement overlaps the one before it.
    pub fn overlap_with(&self, previous: &Self) -> f64 {
        (previous.mix_end_ms - self.mix_start_ms).max(0.0)
    }
}

/// Compute one placement per segment, in mix order.
///
/// A negative crossfade is treated as zero. Returns an empty list for an
/// empty input; fails with [`Error::InvalidSegment`] on a bad trim window.
pub fn place(segments: &[Segment], crossfade_ms: f64) -> Result<Vec<Placement>> {
    let ordered = in_mix_order(segments);

    let issues = trim_issues(&ordered);
    if !issues.is_empty() {
        return Err(Error::InvalidSegment(issues));
    }

    let crossfade_ms = crossfade_ms.max(0.0);
    let mut placements: Vec<Placement> = Vec::with_capacity(ordered.len());

    for segment in ordered {
        let mix_start_ms = placements.last().map_or(0.0, |prev| {
            let start = prev.mix_end_ms - crossfade_ms;
            if start < 0.0 {
                tracing::debug!(
                    "Crossfade of {crossfade_ms} ms exceeds the mix so far ({} ms); '{}' starts at 0",
                    prev.mix_end_ms,
                    segment.title
                );
            }
            start.max(0.0)
        });
        let mix_end_ms = mix_start_ms + segment.trim_span_ms() / segment.speed_rate;

        placements.push(Placement {
            segment_index: segment.order,
            source_path: segment.source_path.clone(),
            source_start_ms: segment.trim_start_ms,
            source_end_ms: segment.trim_end_ms,
            mix_start_ms,
            mix_end_ms,
            speed_rate: segment.speed_rate,
        });
    }

    Ok(placements)
}
