//! Search result shapes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence tag attached to a result set
///
/// `Ongoing` is not a real confidence: it marks a cache row whose remote
/// fetch is still executing and is never served as content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
    Ongoing,
}

impl Confidence {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
            Confidence::Ongoing => "ongoing",
        }
    }

    /// Parse the database representation; unknown values read as absent
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            "ongoing" => Some(Confidence::Ongoing),
            _ => None,
        }
    }

    /// Whether results tagged with this confidence may be cached and served
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Confidence::High | Confidence::Medium)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized song projection stored in cache entries and returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSongDto {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// ISO-8601 date (`YYYY-MM-DD`)
    pub release_date: Option<String>,
    pub artwork_url: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
}

/// Usable cache hit
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub songs: Vec<SearchSongDto>,
    pub confidence: Confidence,
}

/// Where the returned songs came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Cache,
    Database,
    Genius,
    Mixed,
}

/// Response of a song search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub source: SearchSource,
    pub songs: Vec<SearchSongDto>,
    /// False when the caller already asked for a Genius search
    pub can_search_genius: bool,
    pub performed_genius: bool,
    /// Genius results were appended automatically on top of local results
    pub auto_continued: bool,
}
