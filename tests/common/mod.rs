// Shared fixtures for the integration tests

#![allow(dead_code)]

use quickclip::{Environment, MediaError, MediaProbe, ProbeReport, SessionId, SettingsStore, StoreOptions};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// In-memory probe: reports are keyed by video file name
#[derive(Debug, Default)]
pub struct FakeProbe {
    reports: HashMap<String, ProbeReport>,
}

impl FakeProbe {
    pub fn with_video(mut self, file_name: &str, tags: &[(&str, &str)], duration: Option<f64>) -> Self {
        let report = ProbeReport {
            duration,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.reports.insert(file_name.to_string(), report);
        self
    }
}

impl MediaProbe for FakeProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        self.reports.get(name).cloned().ok_or_else(|| MediaError::Parse {
            path: path.to_path_buf(),
            source: serde_json::from_str::<serde_json::Value>("not a probe").unwrap_err(),
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn options(environment: Environment) -> StoreOptions {
    StoreOptions::default()
        .environment(environment)
        .probe(Arc::new(FakeProbe::default()))
}

pub fn open(root: &Path, identity: SessionId) -> SettingsStore {
    SettingsStore::open(root, identity, options(Environment::empty())).unwrap()
}

pub fn open_with_env(root: &Path, identity: SessionId, environment: Environment) -> SettingsStore {
    SettingsStore::open(root, identity, options(environment)).unwrap()
}

pub fn open_with_probe(root: &Path, identity: SessionId, probe: FakeProbe) -> SettingsStore {
    let options = StoreOptions::default()
        .environment(Environment::empty())
        .probe(Arc::new(probe));
    SettingsStore::open(root, identity, options).unwrap()
}

/// Drop an (empty) rendered video into `<root>/output/`
pub fn write_video(root: &Path, file_name: &str) {
    let output = root.join("output");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join(file_name), b"").unwrap();
}

pub fn read_config(root: &Path) -> String {
    fs::read_to_string(root.join("config").join("config.json")).unwrap()
}
