use std::path::{Path, PathBuf};

/// Per-session scratch directories handed to the pipeline collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildSubdir {
    /// Narration audio from the TTS service
    Audios,
    /// Stills from the image-generation server
    Pictures,
    /// Intermediate composited video
    Video,
    /// Saved chat responses
    Responses,
}

impl BuildSubdir {
    pub const ALL: [BuildSubdir; 4] = [
        BuildSubdir::Audios,
        BuildSubdir::Pictures,
        BuildSubdir::Video,
        BuildSubdir::Responses,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            BuildSubdir::Audios => "audios",
            BuildSubdir::Pictures => "pictures",
            BuildSubdir::Video => "video",
            BuildSubdir::Responses => "responses",
        }
    }
}

/// Directory layout under the project root
///
/// ```text
/// <root>/
/// ├── config/config.json
/// ├── build/<session_id>/{audios,pictures,video,responses}/
/// ├── output/
/// ├── assets/
/// └── prompts/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.root.join("prompts")
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn build_dir_for_session(&self, session_id: &str) -> PathBuf {
        self.build_root().join(session_id)
    }
}
