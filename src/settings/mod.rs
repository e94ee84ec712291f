//! Settings store
//!
//! This module provides the `SettingsStore` that manages:
//! - The JSON key-value config file with an environment fallback layer
//! - Field-level encryption of stored secrets
//! - The current session's id and build directory
//! - Lookups of rendered videos and past sessions

mod crypto;
mod env;
mod file;
mod keys;
mod store;

pub use crypto::{derive_key, SettingsCipher, ENCRYPTED_PREFIX, ENCRYPTION_KEY_VAR};
pub use env::Environment;
pub use file::JsonFile;
pub use keys::SettingKey;
pub use store::{SettingsStore, StoreOptions};
