//! Segments and their placement on the mix time axis.

/// Ordered placement with crossfade overlap
pub mod placer;
/// JSON mix requests
pub mod request;
/// Trimmed segments and validation
pub mod segment;

pub use placer::{place, Placement};
pub use request::{Collaborators, MixRequest, SegmentSpec};
pub use segment::{validate_segments, validate_sources, Segment};
