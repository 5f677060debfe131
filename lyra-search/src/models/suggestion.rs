//! Autocomplete suggestion shapes

use serde::{Deserialize, Serialize};

/// What a suggestion's text names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Song,
    Artist,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Song => "song",
            SuggestionKind::Artist => "artist",
        }
    }
}

/// Extra context shown next to a suggestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
}

/// A single autocomplete entry
///
/// `score` is used for ranking inside the engine and never leaves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SuggestionMetadata>,
    #[serde(skip)]
    pub(crate) score: f64,
}

impl Suggestion {
    pub(crate) fn new(
        text: impl Into<String>,
        kind: SuggestionKind,
        metadata: Option<SuggestionMetadata>,
        score: f64,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            metadata,
            score,
        }
    }

    /// Dedup key: a title and an artist with the same text stay distinct
    pub(crate) fn key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.text.to_lowercase())
    }
}
