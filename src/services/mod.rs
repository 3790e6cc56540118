//! Adapters to the outside world.
//!
//! Audio probing and mixing, downloads, lyric lookup, translation and
//! frame rendering. Each sits behind a trait so the engine can be driven
//! with test doubles.

pub mod audio;
pub mod download;
pub mod frames;
pub mod library;
pub mod translation;

pub use audio::{AudioBackend, FfmpegBackend};
pub use download::{AudioSource, YtDlpSource};
pub use frames::{DrawtextRenderer, Frame, FramePlan, FrameRenderer};
pub use library::{LyricsLibrary, MetadataSource, TrackInfo};
pub use translation::{MarkerTranslator, OpenAiTranslator, Translator};
