//! Remote Fallback Coordinator
//!
//! Escalates a search to the remote provider when local confidence is low or
//! the caller forced it, persists what comes back, and appends it to the
//! current result set.
//!
//! At most one remote call per normalized query is attempted while another
//! is outstanding, using the cache row's `ongoing` sentinel. The check and
//! the mark are not atomic: two requests arriving together may both call
//! the provider. That window is accepted.
//!
//! Provider failures never escape: the search degrades to local results.

use futures::future::join_all;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::songs;
use crate::models::{Confidence, SearchSongDto, SongHit};
use crate::services::genius_client::RemoteSongProvider;
use crate::services::query_normalizer::normalize;
use crate::services::result_cache::ResultCache;

/// What the remote phase did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteOutcome {
    /// A provider call was made for this request
    pub performed_remote: bool,
    /// Remote hits were appended automatically on top of local results
    pub auto_continued: bool,
}

/// Releases the in-flight marker when dropped
///
/// `release` clears it inline; if the owning future is dropped first the
/// clear is spawned onto the runtime instead.
struct InFlightGuard {
    cache: ResultCache,
    key: String,
    armed: bool,
}

impl InFlightGuard {
    fn new(cache: ResultCache, key: String) -> Self {
        Self {
            cache,
            key,
            armed: true,
        }
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = self.cache.clear_in_flight(&self.key).await {
            warn!(query = %self.key, error = %e, "Failed to clear in-flight marker");
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let cache = self.cache.clone();
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = cache.clear_in_flight(&key).await {
                        warn!(query = %key, error = %e, "Failed to clear in-flight marker");
                    }
                });
            }
            Err(_) => warn!(query = %key, "No runtime to clear in-flight marker"),
        }
    }
}

/// Remote Fallback Coordinator
#[derive(Clone)]
pub struct RemoteFallback {
    pool: SqlitePool,
    cache: ResultCache,
    provider: Arc<dyn RemoteSongProvider>,
    max_results: usize,
}

impl RemoteFallback {
    pub fn new(
        pool: SqlitePool,
        cache: ResultCache,
        provider: Arc<dyn RemoteSongProvider>,
        max_results: usize,
    ) -> Self {
        Self {
            pool,
            cache,
            provider,
            max_results,
        }
    }

    /// Whether a search with this confidence escalates to the provider
    pub fn should_fetch(force_remote: bool, confidence: Confidence) -> bool {
        force_remote || confidence == Confidence::Low
    }

    /// Fetch from the provider if warranted and merge into `current_songs`
    ///
    /// `current_songs` only grows: new songs are appended, deduplicated by
    /// id, up to the result cap.
    pub async fn maybe_fetch_remote(
        &self,
        trimmed_query: &str,
        force_remote: bool,
        current_songs: &mut Vec<SearchSongDto>,
        current_confidence: Confidence,
    ) -> RemoteOutcome {
        if !Self::should_fetch(force_remote, current_confidence) {
            return RemoteOutcome::default();
        }

        let key = normalize(trimmed_query);

        match self.cache.is_in_flight(&key).await {
            Ok(true) => {
                info!(query = %key, "Remote search already in flight, skipping");
                return RemoteOutcome::default();
            }
            Ok(false) => {}
            Err(e) => {
                warn!(query = %key, error = %e, "Could not check in-flight state, skipping remote search");
                return RemoteOutcome::default();
            }
        }

        if let Err(e) = self.cache.mark_in_flight(&key).await {
            warn!(query = %key, error = %e, "Could not mark remote search in flight, skipping");
            return RemoteOutcome::default();
        }
        let guard = InFlightGuard::new(self.cache.clone(), key.clone());

        let auto_continued = self
            .fetch_and_merge(&key, trimmed_query, force_remote, current_songs, current_confidence)
            .await;

        guard.release().await;

        RemoteOutcome {
            performed_remote: true,
            auto_continued,
        }
    }

    /// Provider call, persistence and merge; returns `auto_continued`
    async fn fetch_and_merge(
        &self,
        key: &str,
        trimmed_query: &str,
        force_remote: bool,
        current_songs: &mut Vec<SearchSongDto>,
        current_confidence: Confidence,
    ) -> bool {
        let hits = match self.provider.search(trimmed_query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    query = %key,
                    provider = self.provider.name(),
                    error = %e,
                    "Remote search failed, continuing with local results"
                );
                return false;
            }
        };

        if hits.is_empty() {
            info!(query = %key, provider = self.provider.name(), "Remote search returned no songs");
            return false;
        }

        let auto_continued = !force_remote && !current_songs.is_empty();

        let persisted = self.persist_hits(key, &hits).await;
        let added = append_unique(current_songs, persisted, self.max_results);

        info!(
            query = %key,
            hits = hits.len(),
            added,
            auto_continued,
            "Merged remote songs into results"
        );

        if let Err(e) = self.cache.put(key, &current_songs[..], current_confidence).await {
            warn!(query = %key, error = %e, "Failed to cache merged results");
        }

        auto_continued
    }

    /// Upsert every hit; hits that fail to persist are dropped
    async fn persist_hits(&self, key: &str, hits: &[SongHit]) -> Vec<SearchSongDto> {
        let results = join_all(hits.iter().map(|hit| songs::upsert_hit(&self.pool, hit))).await;

        results
            .into_iter()
            .zip(hits)
            .filter_map(|(result, hit)| match result {
                Ok(song) => Some(song.to_dto()),
                Err(e) => {
                    warn!(
                        query = %key,
                        external_id = hit.external_id,
                        error = %e,
                        "Failed to persist remote song"
                    );
                    None
                }
            })
            .collect()
    }
}

/// Append songs not already present, up to `limit` total; returns how many were added
fn append_unique(current: &mut Vec<SearchSongDto>, incoming: Vec<SearchSongDto>, limit: usize) -> usize {
    let mut seen: HashSet<_> = current.iter().map(|s| s.id).collect();
    let before = current.len();

    for song in incoming {
        if current.len() >= limit {
            break;
        }
        if seen.insert(song.id) {
            current.push(song);
        }
    }

    current.len() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn dto(title: &str) -> SearchSongDto {
        SearchSongDto {
            id: Uuid::new_v4(),
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: None,
            release_date: None,
            artwork_url: None,
            language: None,
            url: None,
            path: None,
        }
    }

    #[test]
    fn test_should_fetch() {
        assert!(RemoteFallback::should_fetch(false, Confidence::Low));
        assert!(RemoteFallback::should_fetch(true, Confidence::High));
        assert!(!RemoteFallback::should_fetch(false, Confidence::Medium));
        assert!(!RemoteFallback::should_fetch(false, Confidence::High));
    }

    #[test]
    fn test_append_unique_dedups_and_caps() {
        let a = dto("A");
        let b = dto("B");
        let mut current = vec![a.clone()];

        let added = append_unique(&mut current, vec![a.clone(), b.clone(), dto("C"), dto("D")], 3);

        assert_eq!(added, 2);
        let titles: Vec<_> = current.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }
}
