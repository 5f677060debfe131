//! Search cache row operations
//!
//! Raw access to the `search_cache` table. Interpretation of the rows
//! (TTL, confidence gating, JSON decoding) lives in `services::result_cache`.

use lyra_common::Result;
use sqlx::{FromRow, SqlitePool};

/// Raw cache row as stored
#[derive(Debug, Clone, FromRow)]
pub struct CacheRow {
    pub query: String,
    /// JSON array of `SearchSongDto`
    pub songs: String,
    pub confidence: Option<String>,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

/// Load the row for a normalized query
pub async fn load_row(pool: &SqlitePool, query: &str) -> Result<Option<CacheRow>> {
    let row = sqlx::query_as::<_, CacheRow>(
        "SELECT query, songs, confidence, updated_at FROM search_cache WHERE query = ?",
    )
    .bind(query)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or replace the row for a normalized query
pub async fn upsert_row(
    pool: &SqlitePool,
    query: &str,
    songs_json: &str,
    confidence: Option<&str>,
    updated_at: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO search_cache (query, songs, confidence, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(query) DO UPDATE SET
            songs = excluded.songs,
            confidence = excluded.confidence,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(query)
    .bind(songs_json)
    .bind(confidence)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reset confidence to NULL if, and only if, the row is still `ongoing`
///
/// Returns the number of rows cleared (0 or 1).
pub async fn clear_ongoing(pool: &SqlitePool, query: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE search_cache SET confidence = NULL WHERE query = ? AND confidence = 'ongoing'",
    )
    .bind(query)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Newest `high`/`medium` rows whose key starts with `prefix`
pub async fn trusted_rows_with_prefix(
    pool: &SqlitePool,
    prefix: &str,
    limit: usize,
) -> Result<Vec<CacheRow>> {
    let pattern = format!("{}%", super::escape_like(prefix));
    let rows = sqlx::query_as::<_, CacheRow>(
        r#"
        SELECT query, songs, confidence, updated_at FROM search_cache
        WHERE query LIKE ? ESCAPE '\'
          AND confidence IN ('high', 'medium')
        ORDER BY updated_at DESC
        LIMIT ?
        "#,
    )
    .bind(pattern)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Newest `high`/`medium` rows
pub async fn recent_trusted_rows(pool: &SqlitePool, limit: usize) -> Result<Vec<CacheRow>> {
    let rows = sqlx::query_as::<_, CacheRow>(
        r#"
        SELECT query, songs, confidence, updated_at FROM search_cache
        WHERE confidence IN ('high', 'medium')
        ORDER BY updated_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
