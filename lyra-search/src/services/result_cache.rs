//! Result Cache
//!
//! Query → result set cache backed by the `search_cache` table, with
//! read-time TTL expiry and an `ongoing` sentinel that marks a remote fetch
//! in progress for the query.
//!
//! Rows are never deleted. A row is usable only when it is fresh, its songs
//! decode as a JSON array of `SearchSongDto`, and its confidence is `high`
//! or `medium`. Anything else reads as a miss.

use chrono::{DateTime, SecondsFormat, Utc};
use lyra_common::Result;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::db::search_cache::{self, CacheRow};
use crate::models::{CachedResult, Confidence, SearchSongDto};

/// Decoded cache row
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub query: String,
    pub songs: Vec<SearchSongDto>,
    pub confidence: Option<Confidence>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Decode a raw row; malformed rows yield `None`
    fn from_row(row: CacheRow) -> Option<Self> {
        let songs = match serde_json::from_str::<Vec<SearchSongDto>>(&row.songs) {
            Ok(songs) => songs,
            Err(e) => {
                tracing::debug!(query = %row.query, error = %e, "Ignoring cache row with malformed songs");
                return None;
            }
        };
        let updated_at = match DateTime::parse_from_rfc3339(&row.updated_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::debug!(query = %row.query, error = %e, "Ignoring cache row with malformed timestamp");
                return None;
            }
        };

        Some(Self {
            query: row.query,
            songs,
            confidence: row.confidence.as_deref().and_then(Confidence::parse),
            updated_at,
        })
    }

    /// Time since the row was written (zero for timestamps in the future)
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.updated_at).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Timestamp format written to `search_cache.updated_at`
///
/// Fixed-width UTC so that text ordering equals time ordering.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Query result cache
#[derive(Clone)]
pub struct ResultCache {
    pool: SqlitePool,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Usable cached result for a normalized query
    ///
    /// `None` when absent, stale, malformed, or not `high`/`medium`.
    pub async fn get(&self, query: &str) -> Result<Option<CachedResult>> {
        let Some(row) = search_cache::load_row(&self.pool, query).await? else {
            return Ok(None);
        };
        let Some(entry) = CacheEntry::from_row(row) else {
            return Ok(None);
        };

        let confidence = match entry.confidence {
            Some(c) if c.is_cacheable() => c,
            _ => return Ok(None),
        };

        if entry.age(Utc::now()) > self.ttl {
            tracing::debug!(query = %query, "Cache entry expired");
            return Ok(None);
        }

        Ok(Some(CachedResult {
            songs: entry.songs,
            confidence,
        }))
    }

    /// Store a result set worth reusing
    ///
    /// No-op for an empty set or a `low`/`ongoing` confidence.
    pub async fn put(
        &self,
        query: &str,
        songs: &[SearchSongDto],
        confidence: Confidence,
    ) -> Result<()> {
        if songs.is_empty() || !confidence.is_cacheable() {
            tracing::debug!(query = %query, confidence = %confidence, count = songs.len(), "Not caching result set");
            return Ok(());
        }

        let songs_json = serde_json::to_string(songs)?;
        search_cache::upsert_row(
            &self.pool,
            query,
            &songs_json,
            Some(confidence.as_str()),
            &format_timestamp(Utc::now()),
        )
        .await?;

        tracing::debug!(query = %query, confidence = %confidence, count = songs.len(), "Cached result set");
        Ok(())
    }

    /// Mark a remote fetch as running for this query
    ///
    /// Idempotent; calling again refreshes the timestamp.
    pub async fn mark_in_flight(&self, query: &str) -> Result<()> {
        search_cache::upsert_row(
            &self.pool,
            query,
            "[]",
            Some(Confidence::Ongoing.as_str()),
            &format_timestamp(Utc::now()),
        )
        .await
    }

    /// Whether a remote fetch is running for this query
    ///
    /// A marker older than the TTL (or with an unreadable timestamp) is left
    /// over from a fetch that never cleared it and does not count.
    pub async fn is_in_flight(&self, query: &str) -> Result<bool> {
        let Some(row) = search_cache::load_row(&self.pool, query).await? else {
            return Ok(false);
        };
        if row.confidence.as_deref().and_then(Confidence::parse) != Some(Confidence::Ongoing) {
            return Ok(false);
        }

        let marked_at = match DateTime::parse_from_rfc3339(&row.updated_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(_) => return Ok(false),
        };
        let age = (Utc::now() - marked_at).to_std().unwrap_or(Duration::ZERO);
        if age > self.ttl {
            tracing::debug!(query = %query, "Ignoring stale in-flight marker");
            return Ok(false);
        }

        Ok(true)
    }

    /// Release the in-flight marker
    ///
    /// Only rows still `ongoing` are reset, so a result written by the fetch
    /// itself (or by a later request) is left alone.
    pub async fn clear_in_flight(&self, query: &str) -> Result<()> {
        let cleared = search_cache::clear_ongoing(&self.pool, query).await?;
        tracing::debug!(query = %query, cleared, "Cleared in-flight marker");
        Ok(())
    }

    /// Newest trusted entries whose key starts with `prefix`
    pub async fn entries_with_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<CacheEntry>> {
        let rows = search_cache::trusted_rows_with_prefix(&self.pool, prefix, limit).await?;
        Ok(rows.into_iter().filter_map(CacheEntry::from_row).collect())
    }

    /// Newest trusted entries
    pub async fn recent_entries(&self, limit: usize) -> Result<Vec<CacheEntry>> {
        let rows = search_cache::recent_trusted_rows(&self.pool, limit).await?;
        Ok(rows.into_iter().filter_map(CacheEntry::from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use uuid::Uuid;

    async fn test_cache() -> ResultCache {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        lyra_common::db::init_tables(&pool).await.unwrap();
        ResultCache::new(pool, Duration::from_secs(3600))
    }

    fn dto(title: &str) -> SearchSongDto {
        SearchSongDto {
            id: Uuid::new_v4(),
            title: title.to_string(),
            artist: "Queen".to_string(),
            album: None,
            release_date: Some("1975-10-31".to_string()),
            artwork_url: None,
            language: Some("en".to_string()),
            url: None,
            path: Some("/queen-song".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let cache = test_cache().await;
        let songs = vec![dto("Bohemian Rhapsody"), dto("Killer Queen")];

        cache.put("queen", &songs, Confidence::High).await.unwrap();
        let hit = cache.get("queen").await.unwrap().expect("cache hit");

        assert_eq!(hit.songs, songs);
        assert_eq!(hit.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_put_rejects_unusable_results() {
        let cache = test_cache().await;
        let songs = vec![dto("Bohemian Rhapsody")];

        cache.put("empty", &[], Confidence::High).await.unwrap();
        cache.put("low", &songs, Confidence::Low).await.unwrap();
        cache.put("ongoing", &songs, Confidence::Ongoing).await.unwrap();

        assert!(cache.get("empty").await.unwrap().is_none());
        assert!(cache.get("low").await.unwrap().is_none());
        assert!(cache.get("ongoing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_flight_marker_lifecycle() {
        let cache = test_cache().await;

        assert!(!cache.is_in_flight("rare song").await.unwrap());
        cache.mark_in_flight("rare song").await.unwrap();
        cache.mark_in_flight("rare song").await.unwrap();
        assert!(cache.is_in_flight("rare song").await.unwrap());
        assert!(cache.get("rare song").await.unwrap().is_none());

        cache.clear_in_flight("rare song").await.unwrap();
        assert!(!cache.is_in_flight("rare song").await.unwrap());
        assert!(cache.get("rare song").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_in_flight_marker_is_ignored() {
        let cache = test_cache().await;
        let marked = format_timestamp(Utc::now() - chrono::Duration::hours(2));
        search_cache::upsert_row(&cache.pool, "stuck", "[]", Some("ongoing"), &marked)
            .await
            .unwrap();
        assert!(!cache.is_in_flight("stuck").await.unwrap());

        search_cache::upsert_row(&cache.pool, "garbled", "[]", Some("ongoing"), "yesterday")
            .await
            .unwrap();
        assert!(!cache.is_in_flight("garbled").await.unwrap());

        // A fresh mark makes it live again
        cache.mark_in_flight("stuck").await.unwrap();
        assert!(cache.is_in_flight("stuck").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_keeps_result_written_during_fetch() {
        let cache = test_cache().await;
        let songs = vec![dto("Bohemian Rhapsody")];

        cache.mark_in_flight("queen").await.unwrap();
        cache.put("queen", &songs, Confidence::Medium).await.unwrap();
        cache.clear_in_flight("queen").await.unwrap();

        let hit = cache.get("queen").await.unwrap().expect("result survives clear");
        assert_eq!(hit.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_stale_entry_is_a_miss() {
        let cache = test_cache().await;
        let songs = serde_json::to_string(&vec![dto("Bohemian Rhapsody")]).unwrap();
        let old = format_timestamp(Utc::now() - chrono::Duration::hours(2));

        search_cache::upsert_row(&cache.pool, "queen", &songs, Some("high"), &old)
            .await
            .unwrap();

        assert!(cache.get("queen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_rows_are_misses() {
        let cache = test_cache().await;
        let now = format_timestamp(Utc::now());
        let songs = serde_json::to_string(&vec![dto("Bohemian Rhapsody")]).unwrap();

        search_cache::upsert_row(&cache.pool, "object", "{\"songs\":1}", Some("high"), &now)
            .await
            .unwrap();
        search_cache::upsert_row(&cache.pool, "garbage", "not json", Some("high"), &now)
            .await
            .unwrap();
        search_cache::upsert_row(&cache.pool, "timestamp", &songs, Some("high"), "yesterday")
            .await
            .unwrap();
        search_cache::upsert_row(&cache.pool, "unknown", &songs, Some("certain"), &now)
            .await
            .unwrap();
        search_cache::upsert_row(&cache.pool, "absent", &songs, None, &now)
            .await
            .unwrap();

        for key in ["object", "garbage", "timestamp", "unknown", "absent"] {
            assert!(cache.get(key).await.unwrap().is_none(), "{} should miss", key);
        }
    }
}
