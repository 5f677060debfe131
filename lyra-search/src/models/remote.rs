//! Song hits returned by the remote metadata provider

use serde::{Deserialize, Serialize};

/// One song returned by a provider search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongHit {
    /// Provider's immutable song id
    pub external_id: i64,
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
