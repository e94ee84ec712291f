use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Container tag carrying the owning session id
pub const EPISODE_ID_TAG: &str = "episode_id";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} for {}: {stderr}", .path.display())]
    Failed {
        program: String,
        path: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unreadable probe output for {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Container-level information about a media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    /// Duration in seconds, when the container reports one
    pub duration: Option<f64>,
    /// Container metadata tags (title, artist, episode_id, ...)
    pub tags: BTreeMap<String, String>,
}

impl ProbeReport {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn episode_id(&self) -> Option<&str> {
        self.tag(EPISODE_ID_TAG)
    }
}

/// Reads container metadata out of rendered videos
///
/// Implementations:
/// - `FfprobeProbe`: shells out to ffprobe
/// - tests: in-memory fakes keyed by path
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError>;

    /// Probe name for logging
    fn name(&self) -> &str;
}

/// `MediaProbe` backed by the ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

pub(crate) fn parse_ffprobe_json(path: &Path, stdout: &[u8]) -> Result<ProbeReport, MediaError> {
    let output: FfprobeOutput =
        serde_json::from_slice(stdout).map_err(|source| MediaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(ProbeReport {
        duration: output
            .format
            .duration
            .and_then(|d| d.trim().parse::<f64>().ok()),
        tags: output.format.tags,
    })
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<ProbeReport, MediaError> {
        debug!("Probing {} with {}", path.display(), self.program);

        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|source| MediaError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::Failed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_ffprobe_json(path, &output.stdout)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
