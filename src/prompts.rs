use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Result, SettingsError};
use crate::settings::SettingsStore;

/// Prompts the generation pipeline asks the chat service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptName {
    VideoIdea,
    PictureGeneration,
    VideoInfo,
}

impl PromptName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptName::VideoIdea => "video_idea",
            PromptName::PictureGeneration => "picture_generation",
            PromptName::VideoInfo => "video_info",
        }
    }
}

impl fmt::Display for PromptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt templates loaded from `<root>/prompts/`, keyed by file stem
///
/// Templates mentioning `{topics}` get the JSON list of past video titles
/// substituted at load time (`{{`/`}}` escape literal braces there).
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    prompts: HashMap<String, String>,
}

impl PromptCatalog {
    pub fn load(store: &SettingsStore) -> Result<Self> {
        let titles: Vec<String> = store.past_topics()?.titles().map(String::from).collect();
        let topics = serde_json::to_string(&titles)?;

        let mut prompts = HashMap::new();
        match load_dir(&store.prompts_dir(), &topics, &mut prompts) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No prompts directory at {}", store.prompts_dir().display());
            }
            Err(e) => return Err(e.into()),
        }

        info!("Loaded {} prompt templates", prompts.len());
        Ok(Self { prompts })
    }

    pub fn from_templates<I, K, V>(templates: I, topics: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let topics = serde_json::to_string(topics)?;
        Ok(Self {
            prompts: templates
                .into_iter()
                .map(|(name, content)| (name.into(), render(content.as_ref(), &topics)))
                .collect(),
        })
    }

    pub fn get(&self, name: PromptName) -> Result<&str> {
        self.get_raw(name.as_str())
    }

    pub fn get_raw(&self, name: &str) -> Result<&str> {
        self.prompts
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SettingsError::PromptNotFound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

fn load_dir(dir: &Path, topics: &str, prompts: &mut HashMap<String, String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            load_dir(&path, topics, prompts)?;
            continue;
        }

        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let content = fs::read_to_string(&path)?;
        prompts.insert(name.to_string(), render(&content, topics));
    }
    Ok(())
}

fn render(template: &str, topics: &str) -> String {
    const PLACEHOLDER: &str = "{topics}";

    if !template.contains(PLACEHOLDER) {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + topics.len());
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        if rest.starts_with(PLACEHOLDER) {
            out.push_str(topics);
            rest = &rest[PLACEHOLDER.len()..];
        } else if rest.starts_with("{{") || rest.starts_with("}}") {
            out.push(c);
            rest = &rest[2..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}
