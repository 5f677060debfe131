//! Search Orchestrator
//!
//! Top-level song search:
//!
//! ```text
//! CACHE_CHECK -> LOCAL_SEARCH -> CLASSIFY -> REMOTE_FALLBACK? -> CACHE_WRITE -> RESPOND
//! ```
//!
//! A cache hit with enough songs answers without touching the store's
//! search predicates. Local search failures propagate; cache and remote
//! failures degrade.

use lyra_common::config::SearchSettings;
use lyra_common::{Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{SearchResponse, SearchSongDto, SearchSource};
use crate::services::confidence_classifier::classify;
use crate::services::genius_client::RemoteSongProvider;
use crate::services::local_search::LocalSearchEngine;
use crate::services::query_normalizer::{normalize, trimmed};
use crate::services::remote_fallback::RemoteFallback;
use crate::services::result_cache::ResultCache;

/// Search Orchestrator
#[derive(Clone)]
pub struct SearchOrchestrator {
    cache: ResultCache,
    local: LocalSearchEngine,
    remote: RemoteFallback,
    min_cache_results: usize,
}

impl SearchOrchestrator {
    pub fn new(
        cache: ResultCache,
        local: LocalSearchEngine,
        remote: RemoteFallback,
        min_cache_results: usize,
    ) -> Self {
        Self {
            cache,
            local,
            remote,
            min_cache_results,
        }
    }

    /// Wire up cache, local engine and remote fallback over one pool
    pub fn from_settings(
        pool: SqlitePool,
        provider: Arc<dyn RemoteSongProvider>,
        settings: &SearchSettings,
    ) -> Self {
        let cache = ResultCache::new(pool.clone(), settings.cache_ttl());
        let local = LocalSearchEngine::new(pool.clone(), settings);
        let remote = RemoteFallback::new(pool, cache.clone(), provider, settings.max_results);
        Self::new(cache, local, remote, settings.min_cache_results)
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Search songs for a raw user query
    ///
    /// `force_remote` skips the cache and always asks the provider.
    ///
    /// # Errors
    /// - `Error::InvalidInput` for a blank query
    /// - Store errors from the local search predicates
    pub async fn search_songs(&self, raw_query: &str, force_remote: bool) -> Result<SearchResponse> {
        let key = normalize(raw_query);
        if key.is_empty() {
            return Err(Error::InvalidInput("Search query is empty".to_string()));
        }
        let query = trimmed(raw_query);

        // CACHE_CHECK
        if !force_remote {
            match self.cache.get(&key).await {
                Ok(Some(hit)) if hit.songs.len() >= self.min_cache_results => {
                    debug!(query = %key, count = hit.songs.len(), "Serving search from cache");
                    return Ok(SearchResponse {
                        source: SearchSource::Cache,
                        songs: hit.songs,
                        can_search_genius: true,
                        performed_genius: false,
                        auto_continued: false,
                    });
                }
                Ok(_) => {}
                Err(e) => warn!(query = %key, error = %e, "Cache read failed, searching locally"),
            }
        }

        // LOCAL_SEARCH + CLASSIFY
        let local = self.local.search(query).await?;
        let confidence = classify(local.high_count, local.medium_count, local.songs.len());
        debug!(query = %key, confidence = %confidence, count = local.songs.len(), "Classified local results");

        let high_count = local.high_count;
        let mut songs: Vec<SearchSongDto> = local.songs;

        // REMOTE_FALLBACK
        let outcome = self
            .remote
            .maybe_fetch_remote(query, force_remote, &mut songs, confidence)
            .await;

        // CACHE_WRITE (the remote phase caches its own merged set)
        if !outcome.performed_remote && !force_remote {
            if let Err(e) = self.cache.put(&key, &songs, confidence).await {
                warn!(query = %key, error = %e, "Failed to cache local results");
            }
        }

        // RESPOND
        Ok(SearchResponse {
            source: derive_source(force_remote, outcome.performed_remote, high_count, !songs.is_empty()),
            songs,
            can_search_genius: !force_remote,
            performed_genius: outcome.performed_remote,
            auto_continued: outcome.auto_continued,
        })
    }
}

/// Response source for a search that did not come from the cache
///
/// An empty local search reports `genius` even when no remote call was
/// made, signalling that a remote search is the next step.
pub fn derive_source(
    force_remote: bool,
    performed_remote: bool,
    high_count: usize,
    has_songs: bool,
) -> SearchSource {
    if force_remote || performed_remote {
        if performed_remote && high_count > 0 {
            SearchSource::Mixed
        } else {
            SearchSource::Genius
        }
    } else if has_songs {
        SearchSource::Database
    } else {
        SearchSource::Genius
    }
}
