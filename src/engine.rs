//! One mix run: placement, per-segment lyric remapping, and the final merge.
//!
//! The run owns nothing beyond its arguments. Segments are remapped in
//! parallel; the merge waits for all of them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lyrics::{merge, parse_for_mode, remap::remap, TimelineEntry};
use crate::mix::segment::in_mix_order;
use crate::mix::{place, validate_segments, Placement, Segment};

/// Everything a run produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MixTimeline {
    /// One placement per segment, in mix order.
    pub placements: Vec<Placement>,
    /// All lyric lines, non-decreasing in mix time.
    pub entries: Vec<TimelineEntry>,
    /// End of the last-ending segment.
    pub total_duration_ms: f64,
}

/// Lyric entries one segment contributes, given its placement.
pub fn segment_entries(segment: &Segment, placement: &Placement) -> Vec<TimelineEntry> {
    if !segment.lyrics_mode.contributes() {
        return Vec::new();
    }
    let parsed = parse_for_mode(&segment.raw_lyrics, segment.lyrics_mode);
    remap(&parsed, placement)
}

/// Build the placements and merged lyric timeline for a mix.
///
/// Invalid segments abort the run before any remapping, with every problem
/// reported by position.
pub fn build_timeline(segments: &[Segment], crossfade_ms: f64) -> Result<MixTimeline> {
    validate_segments(segments)?;
    let placements = place(segments, crossfade_ms)?;
    let ordered = in_mix_order(segments);

    let per_segment: Vec<(usize, Vec<TimelineEntry>)> = ordered
        .par_iter()
        .zip(placements.par_iter())
        .map(|(segment, placement)| (segment.order, segment_entries(segment, placement)))
        .collect();

    for (order, entries) in &per_segment {
        tracing::debug!("Segment {order} contributes {} lyric lines", entries.len());
    }

    let entries = merge(per_segment);
    let total_duration_ms = placements.iter().map(|p| p.mix_end_ms).fold(0.0, f64::max);

    tracing::info!(
        "Built timeline: {} segments, {} lines, {:.1}s",
        placements.len(),
        entries.len(),
        total_duration_ms / 1000.0
    );

    Ok(MixTimeline { placements, entries, total_duration_ms })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic, clippy::float_cmp)]

    use super::*;
    use crate::lyrics::merge::is_mix_ordered;
    use crate::types::LyricsMode;

    #[test]
    fn timed_and_plain_segments_merge_in_order() {
        let segments = vec![
            Segment::new("one.mp3", 0.0, 20_000.0)
                .with_lyrics("[00:02.00]first\n[00:18.00]fades out")
                .with_order(0),
            Segment::new("two.mp3", 30_000.0, 60_000.0)
                .with_lyrics("alpha\nbeta\ngamma")
                .with_order(1),
        ];

        let timeline = build_timeline(&segments, 4000.0).unwrap();
        assert_eq!(timeline.placements[1].mix_start_ms, 16_000.0);
        assert_eq!(timeline.total_duration_ms, 46_000.0);

        let texts: Vec<_> = timeline.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "alpha", "fades out", "beta", "gamma"]);
        assert!(is_mix_ordered(&timeline.entries));
    }

    #[test]
    fn skip_segment_still_takes_mix_time() {
        let segments = vec![
            Segment::new("one.mp3", 0.0, 10_000.0).with_lyrics("ignored").with_mode(LyricsMode::Skip),
            Segment::new("two.mp3", 0.0, 10_000.0).with_lyrics("kept").with_order(1),
        ];

        let timeline = build_timeline(&segments, 2000.0).unwrap();
        assert_eq!(timeline.entries.len(), 1);
        assert_eq!(timeline.entries[0].mix_time_ms, 8000.0);
        assert_eq!(timeline.entries[0].segment_index, 1);
    }

    #[test]
    fn skipped_segment_yields_no_entries() {
        let segment = Segment::new("one.mp3", 0.0, 10_000.0)
            .with_lyrics("[00:01.00]never shown")
            .with_mode(LyricsMode::Skip);
        let placements = place(std::slice::from_ref(&segment), 0.0).unwrap();
        assert!(segment_entries(&segment, &placements[0]).is_empty());
    }

    #[test]
    fn invalid_segment_aborts_run() {
        let segments = vec![Segment::new("bad.mp3", 10_000.0, 10_000.0).with_lyrics("x")];
        assert!(build_timeline(&segments, 4000.0).is_err());
        assert!(build_timeline(&[], 4000.0).is_err());
    }
}
