//! Database initialization
//!
//! The song store and the search cache share one SQLite file in the root
//! folder. Tables are created on startup if missing; there are no
//! migrations to run.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and the database file when missing, then
/// ensures the schema exists.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the songs, song_trigrams and search_cache tables if they don't exist
///
/// `title_folded`/`artist_folded` and `song_trigrams` are derived from
/// title and artist by the search crate; a NULL `title_folded` marks a row
/// that has not been indexed yet.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            external_id INTEGER UNIQUE,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT,
            release_date TEXT,
            artwork_url TEXT,
            language TEXT,
            url TEXT,
            path TEXT,
            has_details INTEGER NOT NULL DEFAULT 0,
            has_lyrics INTEGER NOT NULL DEFAULT 0,
            has_referents INTEGER NOT NULL DEFAULT 0,
            title_folded TEXT,
            artist_folded TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_has_details ON songs(has_details, updated_at)")
        .execute(pool)
        .await?;

    // Trigram index over folded title (field 0) and artist (field 1)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_trigrams (
            trigram TEXT NOT NULL,
            field INTEGER NOT NULL,
            song_id TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            PRIMARY KEY (trigram, field, song_id)
        ) WITHOUT ROWID
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_song_trigrams_song ON song_trigrams(song_id)")
        .execute(pool)
        .await?;

    // confidence: 'high' | 'medium' | 'low' | 'ongoing' | NULL
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_cache (
            query TEXT PRIMARY KEY,
            songs TEXT NOT NULL DEFAULT '[]',
            confidence TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_cache_updated_at ON search_cache(updated_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database tables initialized (songs, song_trigrams, search_cache)");

    Ok(())
}
