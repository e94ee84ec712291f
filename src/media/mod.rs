//! Rendered video introspection
//!
//! The compositor embeds the session id as an `episode_id` container tag;
//! this module reads tags back so finished videos can be matched to sessions.

mod probe;

pub use probe::{FfprobeProbe, MediaError, MediaProbe, ProbeReport, EPISODE_ID_TAG};
