use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::crypto::{SettingsCipher, ENCRYPTED_PREFIX};
use super::env::Environment;
use super::file::{type_name, JsonFile};
use super::keys::SettingKey;
use crate::error::{Result, SettingsError};
use crate::media::{FfprobeProbe, MediaProbe, ProbeReport};
use crate::session::{
    BuildSubdir, PastTopics, ProjectPaths, SessionId, SessionRecord, TEMP_SESSION_ID,
};

/// Options for opening a [`SettingsStore`]
#[derive(Clone)]
pub struct StoreOptions {
    /// Log directory housekeeping at info level
    pub verbose: bool,

    /// Keys that can never be written or deleted through the store
    pub immutable_keys: HashSet<String>,

    /// Fallback layer for keys missing from the config file
    pub environment: Environment,

    /// Reads tags back out of rendered videos
    pub probe: Arc<dyn MediaProbe>,
}

impl StoreOptions {
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn immutable_key(mut self, key: impl AsRef<str>) -> Self {
        self.immutable_keys.insert(key.as_ref().to_string());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = probe;
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            immutable_keys: HashSet::new(),
            environment: Environment::from_process(),
            probe: Arc::new(FfprobeProbe::default()),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("verbose", &self.verbose)
            .field("immutable_keys", &self.immutable_keys)
            .field("probe", &self.probe.name())
            .finish_non_exhaustive()
    }
}

/// Session-scoped settings and build-state store
///
/// Owns `config/config.json` (a JSON object rewritten in full on every
/// mutation), the environment fallback layer, and the session's build
/// directory. The session id is resolved once in [`SettingsStore::open`];
/// [`SettingsStore::close`] (or dropping the store) records it as the last
/// used session unless it is `"temp"`.
pub struct SettingsStore {
    paths: ProjectPaths,
    file: JsonFile,
    config: Map<String, Value>,
    session_id: String,
    environment: Environment,
    cipher: SettingsCipher,
    immutable_keys: HashSet<String>,
    probe: Arc<dyn MediaProbe>,
    verbose: bool,
    closed: bool,
}

impl SettingsStore {
    /// Open the store rooted at `root` for the given session
    ///
    /// A missing or malformed config file yields an empty store. Fails if the
    /// identity cannot be resolved or the build directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, identity: SessionId, options: StoreOptions) -> Result<Self> {
        let paths = ProjectPaths::new(root);
        let file = JsonFile::new(paths.config_file());
        let config = load_config(&file);
        let cipher = SettingsCipher::new(options.environment.encryption_secret());

        let mut store = Self {
            paths,
            file,
            config,
            session_id: String::new(),
            environment: options.environment,
            cipher,
            immutable_keys: options.immutable_keys,
            probe: options.probe,
            verbose: options.verbose,
            // Nothing to record until the id is resolved
            closed: true,
        };

        let last_session = match identity {
            SessionId::LastUsed => store.last_session_id()?,
            _ => None,
        };
        store.session_id = identity.resolve(last_session.as_deref())?;
        store.create_build_tree()?;
        store.closed = false;

        info!(
            "Opened settings store at {} (session {})",
            store.paths.root_dir().display(),
            store.session_id
        );

        Ok(store)
    }

    /// Reload the config file, falling back to an empty store
    pub fn reinit(&mut self) {
        self.config = load_config(&self.file);
    }

    /// Record the session as last used; idempotent
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.is_temporary() {
            return;
        }

        let id = Value::String(self.session_id.clone());
        if let Err(e) = self.set(SettingKey::LastSessionId, id, false) {
            warn!("Failed to record last session {}: {}", self.session_id, e);
        } else {
            debug!("Recorded last session {}", self.session_id);
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_temporary(&self) -> bool {
        self.session_id == TEMP_SESSION_ID
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// File-backed settings (without the environment layer)
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn immutable_keys(&self) -> &HashSet<String> {
        &self.immutable_keys
    }

    pub fn last_session_id(&self) -> Result<Option<String>> {
        self.get_as(SettingKey::LastSessionId)
    }

    // ---- key-value access ----

    /// Look up `key` in the config file, then the environment
    ///
    /// Encrypted strings are decrypted when a key is configured and decoded as
    /// JSON when possible.
    pub fn get(&self, key: impl AsRef<str>) -> Result<Option<Value>> {
        let key = key.as_ref();

        let value = match self.config.get(key) {
            Some(value) => value.clone(),
            None => match self.environment.get(key) {
                Some(value) => Value::String(value.to_string()),
                None => return Ok(None),
            },
        };

        match value {
            Value::String(s) if self.cipher.is_enabled() && s.starts_with(ENCRYPTED_PREFIX) => {
                let plain = self.cipher.decrypt(&s, false)?;
                let decoded = serde_json::from_str(&plain).unwrap_or(Value::String(plain));
                Ok(Some(decoded))
            }
            value => Ok(Some(value)),
        }
    }

    pub fn get_or(&self, key: impl AsRef<str>, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Typed lookup; a stored `null` reads as `None`
    pub fn get_as<T: DeserializeOwned>(&self, key: impl AsRef<str>) -> Result<Option<T>> {
        match self.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Store `value` under `key` and rewrite the config file
    ///
    /// Immutable keys are ignored. With `encrypt`, strings are encrypted as-is
    /// and lists/mappings as their JSON text; any other type is rejected.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<Value>, encrypt: bool) -> Result<()> {
        let key = key.as_ref();
        if self.immutable_keys.contains(key) {
            debug!("Ignoring write to immutable key {}", key);
            return Ok(());
        }

        let value = value.into();
        let value = if encrypt {
            let plain = match &value {
                Value::String(s) => s.clone(),
                Value::Array(_) | Value::Object(_) => serde_json::to_string(&value)?,
                other => return Err(SettingsError::UnsupportedEncryptionType(type_name(other))),
            };
            Value::String(self.cipher.encrypt(&plain, false)?)
        } else {
            value
        };

        self.config.insert(key.to_string(), value);
        self.persist();
        Ok(())
    }

    /// `set` for raw bytes, stored as (lossy) UTF-8 text
    pub fn set_bytes(&mut self, key: impl AsRef<str>, value: &[u8], encrypt: bool) -> Result<()> {
        let text = String::from_utf8_lossy(value).into_owned();
        self.set(key, Value::String(text), encrypt)
    }

    /// Remove `key` from the config file; immutable, absent and
    /// environment-only keys are left alone.
    pub fn delete(&mut self, key: impl AsRef<str>) {
        let key = key.as_ref();
        if self.immutable_keys.contains(key) {
            debug!("Ignoring delete of immutable key {}", key);
            return;
        }

        if self.config.remove(key).is_some() {
            self.persist();
        }
    }

    pub fn has(&self, key: impl AsRef<str>, check_none: bool) -> bool {
        let key = key.as_ref();

        if let Some(value) = self.config.get(key) {
            return !(check_none && value.is_null());
        }

        self.environment.contains(key)
    }

    pub fn encryption_enabled(&self) -> bool {
        self.cipher.is_enabled()
    }

    pub fn encrypt(&self, value: &str, ignore_errors: bool) -> Result<String> {
        self.cipher.encrypt(value, ignore_errors)
    }

    pub fn decrypt(&self, value: &str, ignore_errors: bool) -> Result<String> {
        self.cipher.decrypt(value, ignore_errors)
    }

    fn persist(&self) {
        if let Err(e) = self.file.save(&self.config) {
            warn!(
                "Failed to write settings to {}: {}",
                self.file.path().display(),
                e
            );
        }
    }

    // ---- past topics ----

    pub fn past_topics(&self) -> Result<PastTopics> {
        Ok(PastTopics::from_value(self.get(SettingKey::PastTopics)?.as_ref()))
    }

    pub fn save_past_topics(&mut self, topics: &PastTopics) -> Result<()> {
        self.set(SettingKey::PastTopics, topics.to_value(), false)
    }

    /// Remember `title` for the current session
    ///
    /// Returns false for temporary sessions and titles already recorded.
    pub fn record_topic(&mut self, title: &str) -> Result<bool> {
        if self.is_temporary() {
            return Ok(false);
        }

        let mut topics = self.past_topics()?;
        let session_id = self.session_id.clone();
        if !topics.record(&session_id, title) {
            return Ok(false);
        }

        self.save_past_topics(&topics)?;
        Ok(true)
    }

    /// Drop the topic at the 0-based `index`, returning `(session id, title)`
    pub fn remove_topic(&mut self, index: usize) -> Result<(String, String)> {
        let mut topics = self.past_topics()?;
        let removed = topics.remove(index)?;
        self.save_past_topics(&topics)?;
        Ok(removed)
    }

    // ---- sessions ----

    /// Whether the identity's build directory exists
    pub fn session_exists(&self, identity: &SessionId) -> bool {
        let session_id = match identity {
            SessionId::LastUsed => self.last_session_id().ok().flatten(),
            SessionId::Unset => None,
            other => other.resolve(None).ok(),
        };

        session_id
            .map(|id| self.paths.build_dir_for_session(&id).exists())
            .unwrap_or(false)
    }

    /// One entry per recorded past topic, in recorded order
    ///
    /// Sessions without a rendered video come back as
    /// `SessionVideoNotFound`; collect into `Result<Vec<_>, _>` to fail on the
    /// first one or filter them out to skip.
    pub fn get_sessions(&self) -> Result<Vec<Result<SessionRecord>>> {
        let topics = self.past_topics()?;
        let videos = self.index_videos()?;

        Ok(topics
            .session_ids()
            .map(|id| {
                videos
                    .iter()
                    .find(|(_, report)| report.episode_id() == Some(id))
                    .map(|(path, report)| self.build_record(id, path, report))
                    .ok_or_else(|| SettingsError::SessionVideoNotFound(id.to_string()))
            })
            .collect())
    }

    /// Record for a single session
    pub fn session_record(&self, session_id: &str) -> Result<SessionRecord> {
        match self.find_video(session_id)? {
            Some((path, report)) => Ok(self.build_record(session_id, &path, &report)),
            None => Err(SettingsError::SessionVideoNotFound(session_id.to_string())),
        }
    }

    /// Rendered video tagged with `session_id`
    ///
    /// With `quiet`, a miss is `Ok(None)` instead of `SessionVideoNotFound`.
    pub fn get_video_path(&self, session_id: &str, quiet: bool) -> Result<Option<PathBuf>> {
        match self.find_video(session_id)? {
            Some((path, _)) => Ok(Some(path)),
            None if quiet => Ok(None),
            None => Err(SettingsError::SessionVideoNotFound(session_id.to_string())),
        }
    }

    /// Container tags of a video file
    pub fn get_metadata(&self, video_path: &Path) -> Result<BTreeMap<String, String>> {
        if !video_path.is_file() {
            return Err(SettingsError::VideoFileNotFound(video_path.to_path_buf()));
        }

        debug!("Getting metadata for {}", video_path.display());
        let report = self.probe.probe(video_path)?;

        if report.tags.is_empty() {
            return Err(SettingsError::MetadataNotFound(video_path.to_path_buf()));
        }

        debug!("Metadata: {:?}", report.tags);
        Ok(report.tags)
    }

    fn find_video(&self, session_id: &str) -> Result<Option<(PathBuf, ProbeReport)>> {
        Ok(self
            .index_videos()?
            .into_iter()
            .find(|(_, report)| report.episode_id() == Some(session_id)))
    }

    /// Probe every `.mp4` in the output directory, sorted by file name
    fn index_videos(&self) -> Result<Vec<(PathBuf, ProbeReport)>> {
        let output_dir = self.paths.output_dir();
        let entries = match fs::read_dir(&output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No output directory at {}", output_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut videos: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "mp4"))
            .collect();
        videos.sort();

        Ok(videos
            .into_iter()
            .filter_map(|path| match self.probe.probe(&path) {
                Ok(report) => Some((path, report)),
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect())
    }

    fn build_record(&self, session_id: &str, path: &Path, report: &ProbeReport) -> SessionRecord {
        let rendered_at = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        SessionRecord::from_probe(session_id, path.to_path_buf(), report, rendered_at)
    }

    // ---- build directories ----

    /// Remove and recreate the current session's build directory
    pub fn clean_build_dir(&self) -> Result<()> {
        self.clean_build_dir_for(&self.session_id)
    }

    /// Remove and recreate the build directory of `session_id`
    ///
    /// Leaves the store's own session and `last_session_id` untouched.
    pub fn clean_build_dir_for(&self, session_id: &str) -> Result<()> {
        let build_dir = self.build_path(session_id, None)?;

        match fs::remove_dir_all(&build_dir) {
            Ok(()) => {
                if self.verbose {
                    info!("Directory '{}' cleaned", build_dir.display());
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Directory '{}' not found", build_dir.display());
            }
            Err(e) => return Err(e.into()),
        }

        self.create_build_tree_for(session_id)
    }

    /// Delete a session's build directory, or one path inside it
    ///
    /// Returns whether anything was removed. `sub_path` must be relative and
    /// stay inside the build directory.
    pub fn remove_build_path(&self, session_id: &str, sub_path: Option<&Path>) -> Result<bool> {
        let target = self.build_path(session_id, sub_path)?;

        if target.is_dir() {
            fs::remove_dir_all(&target)?;
        } else if target.exists() {
            fs::remove_file(&target)?;
        } else {
            return Ok(false);
        }

        info!("Removed {}", target.display());
        Ok(true)
    }

    /// Every file under a session's build directory, sorted
    pub fn list_build_dir(&self, session_id: &str) -> Result<Vec<PathBuf>> {
        let root = self.build_path(session_id, None)?;
        let mut files = Vec::new();
        collect_files(&root, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn build_path(&self, session_id: &str, sub_path: Option<&Path>) -> Result<PathBuf> {
        SessionId::explicit(session_id).resolve(None)?;
        let mut target = self.paths.build_dir_for_session(session_id);

        if let Some(sub_path) = sub_path {
            let escapes = sub_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(SettingsError::InvalidSessionId(format!(
                    "{}/{}",
                    session_id,
                    sub_path.display()
                )));
            }
            target.push(sub_path);
        }

        Ok(target)
    }

    fn create_build_tree(&self) -> Result<()> {
        self.create_build_tree_for(&self.session_id)
    }

    fn create_build_tree_for(&self, session_id: &str) -> Result<()> {
        let build_dir = self.paths.build_dir_for_session(session_id);
        for subdir in BuildSubdir::ALL {
            fs::create_dir_all(build_dir.join(subdir.dir_name()))?;
        }
        Ok(())
    }

    // ---- paths ----

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn root_dir(&self) -> &Path {
        self.paths.root_dir()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.paths.output_dir()
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.paths.assets_dir()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.paths.config_dir()
    }

    pub fn config_file(&self) -> &Path {
        self.file.path()
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.paths.prompts_dir()
    }

    pub fn build_dir(&self) -> PathBuf {
        self.paths.build_dir_for_session(&self.session_id)
    }

    pub fn build_dir_for_session(&self, session_id: &str) -> PathBuf {
        self.paths.build_dir_for_session(session_id)
    }

    pub fn subdir(&self, subdir: BuildSubdir) -> PathBuf {
        self.build_dir().join(subdir.dir_name())
    }

    pub fn audios_dir(&self) -> PathBuf {
        self.subdir(BuildSubdir::Audios)
    }

    pub fn pictures_dir(&self) -> PathBuf {
        self.subdir(BuildSubdir::Pictures)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.subdir(BuildSubdir::Video)
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.subdir(BuildSubdir::Responses)
    }
}

impl Drop for SettingsStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn load_config(file: &JsonFile) -> Map<String, Value> {
    match file.load() {
        Ok(config) => config,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No settings file at {}", file.path().display());
            Map::new()
        }
        Err(e) => {
            warn!(
                "Ignoring unreadable settings file {}: {}",
                file.path().display(),
                e
            );
            Map::new()
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn open(root: &Path, identity: SessionId) -> SettingsStore {
        let options = StoreOptions::default().environment(Environment::empty());
        SettingsStore::open(root, identity, options).unwrap()
    }

    #[test]
    fn test_open_creates_build_tree() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(temp_dir.path(), SessionId::explicit("abc"));

        for subdir in BuildSubdir::ALL {
            assert!(temp_dir.path().join("build/abc").join(subdir.dir_name()).is_dir());
        }
        assert_eq!(store.build_dir(), temp_dir.path().join("build/abc"));
    }

    #[test]
    fn test_set_rejects_unencryptable_types() {
        let temp_dir = TempDir::new().unwrap();
        let options = StoreOptions::default()
            .environment(Environment::empty().with_var("ENCRYPTION_KEY", "k"));
        let mut store = SettingsStore::open(temp_dir.path(), SessionId::Temporary, options).unwrap();

        for value in [json!(1), json!(true), json!(null)] {
            assert!(matches!(
                store.set("x", value, true),
                Err(SettingsError::UnsupportedEncryptionType(_))
            ));
        }
        assert!(!store.has("x", false));
    }

    #[test]
    fn test_env_layer_is_read_only_fallback() {
        let temp_dir = TempDir::new().unwrap();
        let options = StoreOptions::default()
            .environment(Environment::empty().with_var("ELEVENLABS_API_KEY", "from-env"));
        let mut store = SettingsStore::open(temp_dir.path(), SessionId::Temporary, options).unwrap();

        assert_eq!(
            store.get_as::<String>(SettingKey::ElevenLabsApiKey).unwrap(),
            Some("from-env".to_string())
        );

        // env-only keys cannot be deleted
        store.delete(SettingKey::ElevenLabsApiKey);
        assert!(store.has(SettingKey::ElevenLabsApiKey, false));

        store.set(SettingKey::ElevenLabsApiKey, "from-file", false).unwrap();
        assert_eq!(
            store.get(SettingKey::ElevenLabsApiKey).unwrap(),
            Some(json!("from-file"))
        );
    }

    #[test]
    fn test_has_check_none() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = open(temp_dir.path(), SessionId::Temporary);

        store.set("nothing", Value::Null, false).unwrap();
        assert!(store.has("nothing", false));
        assert!(!store.has("nothing", true));
        assert_eq!(store.get_as::<String>("nothing").unwrap(), None);
    }

    #[test]
    fn test_remove_build_path_rejects_escapes() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(temp_dir.path(), SessionId::explicit("s1"));

        assert!(store
            .remove_build_path("s1", Some(Path::new("../other")))
            .is_err());
        assert!(store.remove_build_path("../x", None).is_err());
        assert!(store.build_dir().exists());
    }

    #[test]
    fn test_remove_build_sub_path() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(temp_dir.path(), SessionId::explicit("s1"));
        fs::write(store.pictures_dir().join("0.jpeg"), b"img").unwrap();

        assert!(store
            .remove_build_path("s1", Some(Path::new("pictures/0.jpeg")))
            .unwrap());
        assert!(!store.pictures_dir().join("0.jpeg").exists());
        assert!(store.pictures_dir().exists());
        assert!(!store
            .remove_build_path("s1", Some(Path::new("pictures/0.jpeg")))
            .unwrap());
    }

    #[test]
    fn test_list_build_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(temp_dir.path(), SessionId::explicit("s1"));
        fs::write(store.audios_dir().join("0.mp3"), b"a").unwrap();
        fs::write(store.responses_dir().join("voiceover.txt"), b"t").unwrap();

        let files = store.list_build_dir("s1").unwrap();
        assert_eq!(
            files,
            vec![
                store.audios_dir().join("0.mp3"),
                store.responses_dir().join("voiceover.txt"),
            ]
        );
    }
}
