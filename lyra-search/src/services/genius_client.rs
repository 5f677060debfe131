//! Genius API client
//!
//! Remote metadata provider used as the search fallback. Calls are
//! throttled client-side with a `governor` rate limiter and bounded by the
//! HTTP client's own timeout; there is no other cancellation.
//!
//! # API Reference
//! - Endpoint: `GET https://api.genius.com/search?q=...`
//! - Auth: bearer access token
//! - Response: `{ "response": { "hits": [ { "type": "song", "result": { ... } } ] } }`

use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::SongHit;

/// Genius API base URL
pub const GENIUS_API_URL: &str = "https://api.genius.com";

/// Default timeout for Genius API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = concat!("Lyra/", env!("CARGO_PKG_VERSION"));

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Genius API token not configured")]
    MissingToken,
}

/// Remote song search
///
/// Implemented by `GeniusClient`; tests substitute scripted providers.
#[async_trait]
pub trait RemoteSongProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Search songs matching `query`
    async fn search(&self, query: &str) -> Result<Vec<SongHit>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct GeniusEnvelope {
    response: GeniusSearchResponse,
}

#[derive(Debug, Deserialize)]
struct GeniusSearchResponse {
    #[serde(default)]
    hits: Vec<GeniusHit>,
}

#[derive(Debug, Deserialize)]
struct GeniusHit {
    #[serde(rename = "type")]
    hit_type: Option<String>,
    result: GeniusSong,
}

#[derive(Debug, Deserialize)]
struct GeniusSong {
    id: i64,
    title: String,
    artist_names: Option<String>,
    primary_artist: Option<GeniusArtist>,
    album: Option<GeniusAlbum>,
    release_date_components: Option<GeniusDateComponents>,
    song_art_image_url: Option<String>,
    header_image_thumbnail_url: Option<String>,
    language: Option<String>,
    url: Option<String>,
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeniusArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GeniusAlbum {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GeniusDateComponents {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
}

impl GeniusDateComponents {
    /// ISO date, only when all components form a valid date
    fn to_iso(&self) -> Option<String> {
        let date = NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)?;
        Some(date.format("%Y-%m-%d").to_string())
    }
}

impl GeniusSong {
    fn into_hit(self) -> SongHit {
        let artist = self
            .primary_artist
            .map(|a| a.name)
            .or(self.artist_names)
            .unwrap_or_else(|| "Unknown Artist".to_string());

        SongHit {
            external_id: self.id,
            title: self.title,
            artist,
            album: self.album.map(|a| a.name),
            release_date: self.release_date_components.as_ref().and_then(|d| d.to_iso()),
            artwork_url: self.song_art_image_url.or(self.header_image_thumbnail_url),
            language: self.language,
            url: self.url,
            path: self.path,
        }
    }
}

/// Decode a Genius search response body into song hits
///
/// Non-song hits are skipped.
pub(crate) fn parse_search_response(body: &str) -> Result<Vec<SongHit>, ProviderError> {
    let envelope: GeniusEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::ParseError(e.to_string()))?;

    Ok(envelope
        .response
        .hits
        .into_iter()
        .filter(|hit| hit.hit_type.as_deref().map_or(true, |t| t == "song"))
        .map(|hit| hit.result.into_hit())
        .collect())
}

/// Genius API client
pub struct GeniusClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl GeniusClient {
    /// Create a client
    ///
    /// A missing token is accepted: every search then fails with
    /// `ProviderError::MissingToken` and callers degrade to local results.
    pub fn new(
        token: Option<String>,
        base_url: Option<String>,
        requests_per_second: u32,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: base_url
                .unwrap_or_else(|| GENIUS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl RemoteSongProvider for GeniusClient {
    fn name(&self) -> &'static str {
        "Genius"
    }

    async fn search(&self, query: &str) -> Result<Vec<SongHit>, ProviderError> {
        let token = self.token.as_deref().ok_or(ProviderError::MissingToken)?;

        self.rate_limiter.until_ready().await;

        let url = format!("{}/search", self.base_url);
        debug!(query = %query, url = %url, "Querying Genius API");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;
        let hits = parse_search_response(&body)?;

        tracing::info!(query = %query, count = hits.len(), "Retrieved songs from Genius");

        Ok(hits)
    }
}
