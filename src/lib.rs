pub mod config;
pub mod error;
pub mod media;
pub mod prompts;
pub mod session;
pub mod settings;

pub use config::AppConfig;
pub use error::{Result, SettingsError};
pub use media::{FfprobeProbe, MediaError, MediaProbe, ProbeReport};
pub use prompts::{PromptCatalog, PromptName};
pub use session::{
    BuildSubdir, KeywordMatch, PastTopics, ProjectPaths, SessionId, SessionRecord,
    TEMP_SESSION_ID,
};
pub use settings::{Environment, SettingKey, SettingsStore, StoreOptions};
