//! Session identity, layout and history

mod identity;
mod paths;
mod record;
mod topics;

pub use identity::{generate_session_id, validate_session_id, SessionId, TEMP_SESSION_ID};
pub use paths::{BuildSubdir, ProjectPaths};
pub use record::{SessionRecord, UNKNOWN};
pub use topics::{parse_keywords, KeywordMatch, PastTopics};
