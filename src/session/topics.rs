use serde_json::{Map, Value};

use crate::error::{Result, SettingsError};

/// How keyword filters combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordMatch {
    /// A title matches if it contains any keyword
    #[default]
    Any,
    /// A title must contain every keyword
    All,
}

/// Ordered session id → video title history (`past_topics` setting)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PastTopics {
    entries: Vec<(String, String)>,
}

impl PastTopics {
    /// Read from the stored setting; non-string titles are rendered as JSON
    pub fn from_value(value: Option<&Value>) -> Self {
        let entries = match value {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(id, title)| {
                    let title = match title {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (id.clone(), title)
                })
                .collect(),
            _ => Vec::new(),
        };

        Self { entries }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(id, title)| (id.clone(), Value::String(title.clone())))
                .collect::<Map<String, Value>>(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, title)| title.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, title)| (id.as_str(), title.as_str()))
    }

    pub fn title_for(&self, session_id: &str) -> Option<&str> {
        self.iter()
            .find(|(id, _)| *id == session_id)
            .map(|(_, title)| title)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.titles().any(|t| t == title)
    }

    /// Record `title` for `session_id`; returns false if the title is
    /// already in the history.
    pub fn record(&mut self, session_id: &str, title: &str) -> bool {
        if self.contains_title(title) {
            return false;
        }

        match self.entries.iter_mut().find(|(id, _)| id == session_id) {
            Some(entry) => entry.1 = title.to_string(),
            None => self
                .entries
                .push((session_id.to_string(), title.to_string())),
        }
        true
    }

    /// Remove the entry at the 0-based `index`, returning `(id, title)`
    pub fn remove(&mut self, index: usize) -> Result<(String, String)> {
        if index >= self.entries.len() {
            return Err(SettingsError::TopicIndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Titles (with their 0-based index) containing the given keywords
    ///
    /// Keywords are compared case-insensitively with `#` stripped; an empty
    /// keyword list matches every title.
    pub fn filter<'a>(
        &'a self,
        keywords: &[String],
        mode: KeywordMatch,
    ) -> Vec<(usize, &'a str)> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|k| k.replace('#', "").trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        self.titles()
            .enumerate()
            .filter(|(_, title)| {
                if keywords.is_empty() {
                    return true;
                }
                let title = title.to_lowercase();
                let mut hits = keywords.iter().map(|k| title.contains(k.as_str()));
                match mode {
                    KeywordMatch::Any => hits.any(|hit| hit),
                    KeywordMatch::All => hits.all(|hit| hit),
                }
            })
            .collect()
    }
}

/// Split a comma separated keyword argument (`"#cats, dogs"`)
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.replace('#', "").trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
