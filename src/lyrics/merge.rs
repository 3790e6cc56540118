//! Merging per-segment entries into one mix-ordered timeline.

use super::remap::TimelineEntry;

/// Concatenate entries in segment order and stable-sort by mix time.
///
/// Ties keep segment order first and within-segment order second, because
/// the concatenation already has that order and the sort is stable. Entries
/// are never deduplicated: two segments can share a timestamp inside a
/// crossfade.
pub fn merge(per_segment: Vec<(usize, Vec<TimelineEntry>)>) -> Vec<TimelineEntry> {
    let mut groups = per_segment;
    groups.sort_by_key(|(order, _)| *order);

    let mut merged: Vec<TimelineEntry> = groups.into_iter().flat_map(|(_, entries)| entries).collect();
    merged.sort_by(|a, b| a.mix_time_ms.total_cmp(&b.mix_time_ms));
    merged
}

/// Whether a timeline is non-decreasing in mix time.
pub fn is_mix_ordered(entries: &[TimelineEntry]) -> bool {
    entries.windows(2).all(|w| w[0].mix_time_ms <= w[1].mix_time_ms)
}
