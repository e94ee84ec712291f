use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::media::FfprobeProbe;

/// Process-level configuration for the `quickclip` binary
///
/// Layered as: built-in defaults, an optional `quickclip.{toml,json,yaml}`
/// file, then `QUICKCLIP_*` environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Project root holding `config/`, `build/`, `output/`, ... (`~` allowed)
    pub root_dir: Option<String>,

    /// ffprobe binary used to read video tags
    pub ffprobe: String,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("ffprobe", "ffprobe")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("QUICKCLIP"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root_dir {
            Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }

    pub fn probe(&self) -> FfprobeProbe {
        FfprobeProbe::new(self.ffprobe.clone())
    }
}
