//! `mixset` - crossfaded mixsets with lyric timelines that follow the mix.
//!
//! Trimmed songs are laid end to end with overlapping crossfades, and every
//! lyric line (timed LRC or plain text) is projected onto the mix's own time
//! axis and merged into one ordered timeline.

/// Application configuration.
pub mod config;
/// Application constants.
pub mod constants;
/// The mix run: placement, remapping and merge.
pub mod engine;
/// Error types.
pub mod error;
/// Lyric parsing, remapping, merging and LRC export.
pub mod lyrics;
/// Segments, their placement and mix requests.
pub mod mix;
/// Audio, download, lyric lookup, translation and frame adapters.
pub mod services;
/// Shared domain types.
pub mod types;

pub use engine::{build_timeline, MixTimeline};
pub use error::{Error, Result};
