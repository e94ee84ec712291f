use std::path::PathBuf;
use thiserror::Error;

use crate::media::MediaError;

/// Errors raised by the settings store and the session helpers built on it
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("ENCRYPTION_KEY is not set in the environment variables")]
    EncryptionKeyNotConfigured,

    #[error("cannot encrypt a value of type {0}")]
    UnsupportedEncryptionType(&'static str),

    #[error("failed to decrypt stored value: {0}")]
    Decryption(String),

    #[error("no previous session found")]
    NoPreviousSession,

    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("no video found for session {0}")]
    SessionVideoNotFound(String),

    #[error("video file not found: {}", .0.display())]
    VideoFileNotFound(PathBuf),

    #[error("metadata not found in {}", .0.display())]
    MetadataNotFound(PathBuf),

    #[error("invalid topic index {index} ({len} topics recorded)")]
    TopicIndexOutOfRange { index: usize, len: usize },

    #[error("prompt '{0}' not found")]
    PromptNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Media(#[from] MediaError),
}

pub type Result<T> = std::result::Result<T, SettingsError>;
