// Integration tests for encrypted settings values
//
// The passphrase comes from ENCRYPTION_KEY in the store's environment layer;
// tokens below were produced by earlier releases and must keep decrypting.

mod common;

use anyhow::Result;
use quickclip::{Environment, SessionId, SettingKey, SettingsError};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const PASSPHRASE: &str = "quickclip-test";

// "sk-legacy-0042"
const LEGACY_TOKEN: &str =
    "gAAAAABlU_EAZaRDaE4UwNv3emmuEuhEYpUq-6cfnNcvcz0DvUzveZEmTpgLUHNzIOXufXRBvTED6XCHh2LcdwNtp4SHPERCDg==";

// {"client_id": "abc", "scopes": ["upload"]}
const LEGACY_JSON_TOKEN: &str = "gAAAAABlU_EAusJYAhhAMySYa-rW4EYUVRNlvhRZd-iDTrEgQ2Uy9H8B8iSEudGRUZjQpFQQhvD2dpJ45S7TDTRDWIgPeuBKwT6g4ATB5RzeWAPhaDmL-qaV3JZvebKW4GsUXlalLHW5";

fn encrypted_env() -> Environment {
    Environment::empty().with_var("ENCRYPTION_KEY", PASSPHRASE)
}

#[test]
fn test_encrypt_decrypt_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = common::open_with_env(temp_dir.path(), SessionId::Temporary, encrypted_env());

    assert!(store.encryption_enabled());
    for plain in ["a", "sk-proj-1234567890", "ünïcödé ✓", "{\"looks\": \"like json\"}"] {
        let token = store.encrypt(plain, false)?;
        assert_ne!(token, plain);
        assert_eq!(store.decrypt(&token, false)?, plain);
    }

    Ok(())
}

#[test]
fn test_encrypted_set_stores_ciphertext() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut store = common::open_with_env(temp_dir.path(), SessionId::Temporary, encrypted_env());

    store.set(SettingKey::ElevenLabsApiKey, "sk-secret", true)?;

    let on_disk = common::read_config(temp_dir.path());
    assert!(!on_disk.contains("sk-secret"));
    assert!(on_disk.contains("gAAAAA"));
    assert_eq!(store.get(SettingKey::ElevenLabsApiKey)?, Some(json!("sk-secret")));

    Ok(())
}

#[test]
fn test_encrypted_collections_decode_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut store = common::open_with_env(temp_dir.path(), SessionId::Temporary, encrypted_env());

    let credentials = json!({"token": "ya29.a0", "refresh_token": "1//0g", "scopes": ["upload"]});
    store.set(SettingKey::YoutubeAuthSession, credentials.clone(), true)?;
    store.set("hosts", json!(["a", "b"]), true)?;

    assert_eq!(store.get(SettingKey::YoutubeAuthSession)?, Some(credentials));
    assert_eq!(store.get("hosts")?, Some(json!(["a", "b"])));

    Ok(())
}

#[test]
fn test_reads_values_written_by_earlier_releases() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join("config"))?;
    fs::write(
        temp_dir.path().join("config/config.json"),
        json!({
            "ELEVENLABS_API_KEY": LEGACY_TOKEN,
            "youtube_auth_session": LEGACY_JSON_TOKEN,
        })
        .to_string(),
    )?;

    let store = common::open_with_env(temp_dir.path(), SessionId::Temporary, encrypted_env());

    assert_eq!(
        store.get(SettingKey::ElevenLabsApiKey)?,
        Some(json!("sk-legacy-0042"))
    );
    assert_eq!(
        store.get(SettingKey::YoutubeAuthSession)?,
        Some(json!({"client_id": "abc", "scopes": ["upload"]}))
    );

    Ok(())
}

#[test]
fn test_without_key_values_pass_through_when_ignoring_errors() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = common::open(temp_dir.path(), SessionId::Temporary);

    assert!(!store.encryption_enabled());
    assert_eq!(store.encrypt("plain", true)?, "plain");
    assert_eq!(store.decrypt("plain", true)?, "plain");

    Ok(())
}

#[test]
fn test_without_key_strict_operations_fail() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut store = common::open(temp_dir.path(), SessionId::Temporary);

    assert!(matches!(
        store.encrypt("plain", false),
        Err(SettingsError::EncryptionKeyNotConfigured)
    ));
    assert!(matches!(
        store.decrypt(LEGACY_TOKEN, false),
        Err(SettingsError::EncryptionKeyNotConfigured)
    ));
    assert!(matches!(
        store.set("secret", "plain", true),
        Err(SettingsError::EncryptionKeyNotConfigured)
    ));
    assert!(!store.has("secret", false));

    Ok(())
}

#[test]
fn test_without_key_ciphertext_is_returned_verbatim() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut store = common::open(temp_dir.path(), SessionId::Temporary);

    store.set("stored", LEGACY_TOKEN, false)?;
    assert_eq!(store.get("stored")?, Some(json!(LEGACY_TOKEN)));

    Ok(())
}

#[test]
fn test_wrong_passphrase_fails_on_read() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut store = common::open_with_env(
        temp_dir.path(),
        SessionId::Temporary,
        Environment::empty().with_var("ENCRYPTION_KEY", "not-the-passphrase"),
    );

    store.set("stored", LEGACY_TOKEN, false)?;
    assert!(matches!(store.get("stored"), Err(SettingsError::Decryption(_))));

    Ok(())
}
