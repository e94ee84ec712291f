use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::media::ProbeReport;

/// Placeholder for text tags the compositor did not write
pub const UNKNOWN: &str = "Unknown";

/// A finished session, reconstructed from its rendered video's tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session id (the video's `episode_id` tag)
    pub id: String,

    /// Rendered video under `output/`
    pub video_path: PathBuf,

    /// `artist` tag
    pub owner: String,

    /// `title` tag
    pub title: String,

    /// `description` tag
    pub description: String,

    /// Container duration in seconds
    pub duration_secs: Option<f64>,

    /// `genre` tag (numeric category id)
    pub genre: Option<i64>,

    /// `date` tag
    pub date: Option<i64>,

    /// `comment` tag split on commas
    pub tags: Vec<String>,

    /// `copyright` tag
    pub copyright: String,

    /// `album` tag (used for music credits)
    pub credits: String,

    /// Last modification time of the rendered file
    pub rendered_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn from_probe(
        id: impl Into<String>,
        video_path: PathBuf,
        report: &ProbeReport,
        rendered_at: Option<DateTime<Utc>>,
    ) -> Self {
        let text = |name: &str| report.tag(name).unwrap_or(UNKNOWN).to_string();
        let number = |name: &str| report.tag(name).and_then(|v| v.trim().parse::<i64>().ok());

        Self {
            id: id.into(),
            video_path,
            owner: text("artist"),
            title: text("title"),
            description: text("description"),
            duration_secs: report.duration,
            genre: number("genre"),
            date: number("date"),
            tags: split_tags(report.tag("comment").unwrap_or_default()),
            copyright: text("copyright"),
            credits: text("album").trim().to_string(),
            rendered_at,
        }
    }
}

fn split_tags(comment: &str) -> Vec<String> {
    comment
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}
