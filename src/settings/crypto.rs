use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use fernet::Fernet;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::debug;

use crate::error::{Result, SettingsError};

/// Environment variable holding the passphrase the cipher key is derived from
pub const ENCRYPTION_KEY_VAR: &str = "ENCRYPTION_KEY";

/// Every Fernet token starts with this (version byte 0x80 + timestamp high bytes)
pub const ENCRYPTED_PREFIX: &str = "gAAAAA";

// Values encrypted by earlier releases depend on these three constants.
const KDF_SALT: [u8; 16] = [
    0x34, 0x45, 0x4c, 0xef, 0x45, 0xad, 0xb9, 0xc4, 0x9b, 0x8d, 0x3a, 0x86, 0x95, 0x53, 0x67, 0x99,
];
const KDF_ITERATIONS: u32 = 100_000;
const KEY_LEN: usize = 32;

/// Derive the URL-safe base64 Fernet key for a passphrase
pub fn derive_key(secret: &str) -> String {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), &KDF_SALT, KDF_ITERATIONS, &mut key);
    let encoded = URL_SAFE.encode(key);
    key.fill(0);
    encoded
}

/// Symmetric cipher for stored settings values
///
/// Disabled when no passphrase is configured; every operation then either
/// passes the value through (`ignore_errors`) or fails with
/// `EncryptionKeyNotConfigured`.
pub struct SettingsCipher {
    fernet: Option<Fernet>,
}

impl SettingsCipher {
    /// Cipher keyed by `secret`; without one, encryption is disabled
    pub fn new(secret: Option<&str>) -> Self {
        let Some(secret) = secret else {
            return Self::disabled();
        };

        debug!("Deriving settings encryption key");
        Self {
            fernet: Fernet::new(&derive_key(secret)),
        }
    }

    pub fn disabled() -> Self {
        Self { fernet: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.fernet.is_some()
    }

    pub fn encrypt(&self, value: &str, ignore_errors: bool) -> Result<String> {
        if ignore_errors && (!self.is_enabled() || value.is_empty()) {
            return Ok(value.to_string());
        }

        let fernet = self.fernet()?;
        Ok(fernet.encrypt(value.as_bytes()))
    }

    pub fn decrypt(&self, value: &str, ignore_errors: bool) -> Result<String> {
        if ignore_errors && (!self.is_enabled() || value.is_empty()) {
            return Ok(value.to_string());
        }

        let fernet = self.fernet()?;
        let plain = fernet
            .decrypt(value)
            .map_err(|e| SettingsError::Decryption(format!("{:?}", e)))?;

        String::from_utf8(plain).map_err(|e| SettingsError::Decryption(e.to_string()))
    }

    fn fernet(&self) -> Result<&Fernet> {
        self.fernet
            .as_ref()
            .ok_or(SettingsError::EncryptionKeyNotConfigured)
    }
}

impl std::fmt::Debug for SettingsCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsCipher")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
