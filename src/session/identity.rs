use std::fmt;

use crate::error::{Result, SettingsError};

/// Id used by throwaway runs; never persisted as the last session
pub const TEMP_SESSION_ID: &str = "temp";

/// How the store should pick its session id
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionId {
    /// Scratch session, always `"temp"`
    Temporary,
    /// The session recorded by the previous run
    LastUsed,
    /// A brand new session with a random id
    #[default]
    Unset,
    /// Caller-supplied id (e.g. from `--session-id`)
    Explicit(String),
}

impl SessionId {
    pub fn explicit(id: impl Into<String>) -> Self {
        SessionId::Explicit(id.into())
    }

    /// Map a CLI value to an identity, treating `"temp"` as `Temporary`
    pub fn from_arg(id: Option<&str>) -> Self {
        match id {
            Some(TEMP_SESSION_ID) => SessionId::Temporary,
            Some(id) => SessionId::explicit(id),
            None => SessionId::LastUsed,
        }
    }

    /// Resolve to a concrete id
    ///
    /// `last_session` is the persisted last session id, if any.
    pub fn resolve(&self, last_session: Option<&str>) -> Result<String> {
        match self {
            SessionId::Temporary => Ok(TEMP_SESSION_ID.to_string()),
            SessionId::Unset => Ok(generate_session_id()),
            SessionId::LastUsed => match last_session {
                Some(id) => {
                    validate_session_id(id)?;
                    Ok(id.to_string())
                }
                None => Err(SettingsError::NoPreviousSession),
            },
            SessionId::Explicit(id) => {
                validate_session_id(id)?;
                Ok(id.clone())
            }
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Temporary => f.write_str(TEMP_SESSION_ID),
            SessionId::LastUsed => f.write_str("<last session>"),
            SessionId::Unset => f.write_str("<new session>"),
            SessionId::Explicit(id) => f.write_str(id),
        }
    }
}

/// Fresh 32-character lowercase hex id
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Session ids name a directory under `build/`, so they must be a single
/// plain path component.
pub fn validate_session_id(id: &str) -> Result<()> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);

    if invalid {
        return Err(SettingsError::InvalidSessionId(id.to_string()));
    }
    Ok(())
}
