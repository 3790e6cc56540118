//! Lyric parsing, remapping onto the mix, and merging.
//!
//! Lines flow through three steps per run: [`source`] turns raw text into
//! lines, [`remap`] projects them onto mix time using a segment's placement,
//! and [`merge`] joins every segment into one ordered timeline.

/// LRC export of finished timelines
pub mod lrc;
/// Cross-segment merge
pub mod merge;
/// Source-time to mix-time projection
pub mod remap;
/// Raw text parsing and mode inference
pub mod source;

pub use lrc::to_lrc;
pub use merge::merge;
pub use remap::{remap_plain, remap_timed, TimelineEntry};
pub use source::{infer_mode, parse_for_mode, parse_plain, parse_timed, LyricLine, ParsedLyrics};
