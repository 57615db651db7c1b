//! Data handed back to the host by the provider.
//!
//! Every value here is built per call and owned by the caller afterwards; nothing is cached.

use serde::{Deserialize, Serialize};

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub name: String,
    /// Canonical novel page URL, `{main}/novelas/{id}/{slug}`.
    pub url: String,
    pub poster_url: Option<String>,
    /// 0-1000 scale.
    pub rating: i32,
    /// e.g. `"Capítulos: 120"` when the API reports a chapter count.
    pub latest_chapter: Option<String>,
}

/// Full novel page: metadata plus chapters in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NovelDetail {
    pub id: u64,
    pub name: String,
    pub slug: Option<String>,
    pub url: String,
    pub author: Option<String>,
    pub poster_url: Option<String>,
    /// Plain text; HTML from the API is flattened.
    pub synopsis: Option<String>,
    pub status: NovelStatus,
    /// Status exactly as the API labelled it.
    pub status_label: Option<String>,
    pub tags: Vec<String>,
    /// 0-1000 scale.
    pub rating: i32,
    pub chapters: Vec<ChapterRef>,
}

/// One entry of a novel's chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterRef {
    pub name: String,
    pub url: String,
    pub date_of_release: Option<String>,
    /// Explicit order from the API, or 1-based list position.
    pub order: u32,
}

/// Publication status, normalised from the site's free-text labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NovelStatus {
    Ongoing,
    Completed,
    Paused,
    Dropped,
    #[default]
    Unknown,
}

impl NovelStatus {
    /// Map a status label (Spanish or English, any case) to a status.
    pub fn from_label(label: Option<&str>) -> Self {
        let label = match label {
            Some(l) => l.trim().to_lowercase(),
            None => return NovelStatus::Unknown,
        };
        const DROPPED: &[&str] = &["cancel", "abandon", "dropped"];
        const PAUSED: &[&str] = &["pausa", "hiatus", "pause", "inactiv"];
        const COMPLETED: &[&str] = &["finaliz", "complet", "terminad"];
        const ONGOING: &[&str] = &["activ", "emisión", "emision", "en curso", "ongoing"];
        // "activ" is a substring of "inactiv", so the narrower labels are checked first.
        let has = |needles: &[&str]| needles.iter().any(|n| label.contains(n));
        if has(DROPPED) {
            NovelStatus::Dropped
        } else if has(PAUSED) {
            NovelStatus::Paused
        } else if has(COMPLETED) {
            NovelStatus::Completed
        } else if has(ONGOING) {
            NovelStatus::Ongoing
        } else {
            NovelStatus::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NovelStatus::Ongoing => "ongoing",
            NovelStatus::Completed => "completed",
            NovelStatus::Paused => "paused",
            NovelStatus::Dropped => "dropped",
            NovelStatus::Unknown => "unknown",
        }
    }
}
