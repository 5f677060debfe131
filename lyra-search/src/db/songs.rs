//! Song database operations
//!
//! Read predicates used by search and suggestions, plus upserts of songs
//! resolved through the remote provider. Every search predicate is
//! restricted to `has_details = 1` rows.
//!
//! Matching runs on the case-folded `title_folded`/`artist_folded` columns
//! and the `song_trigrams` index, both rewritten on every write here.

use lyra_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::escape_like;
use crate::models::{SearchSongDto, SongHit};
use crate::utils::{fold_case, trigram_keys, TrigramQuery};

/// `song_trigrams.field` values
const TITLE_FIELD: i64 = 0;
const ARTIST_FIELD: i64 = 1;

const SONG_COLUMNS: &str = "id, external_id, title, artist, album, release_date, artwork_url, \
                            language, url, path, has_details, has_lyrics, has_referents";

/// Song record
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: Uuid,
    /// Provider id, unknown until the song is resolved remotely
    pub external_id: Option<i64>,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub release_date: Option<String>,
    pub artwork_url: Option<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
    /// Song has been enriched with content; only these rows are searchable
    pub has_details: bool,
    pub has_lyrics: bool,
    pub has_referents: bool,
}

impl Song {
    /// Create a local song with no provider id and no content yet
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            title: title.into(),
            artist: artist.into(),
            album: None,
            release_date: None,
            artwork_url: None,
            language: None,
            url: None,
            path: None,
            has_details: false,
            has_lyrics: false,
            has_referents: false,
        }
    }

    /// Projection stored in the cache and returned to callers
    pub fn to_dto(&self) -> SearchSongDto {
        SearchSongDto {
            id: self.id,
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            release_date: self.release_date.clone(),
            artwork_url: self.artwork_url.clone(),
            language: self.language.clone(),
            url: self.url.clone(),
            path: self.path.clone(),
        }
    }
}

/// Song with its trigram similarity to a query
#[derive(Debug, Clone)]
pub struct ScoredSong {
    pub song: Song,
    pub score: f64,
}

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let id_str: String = row.try_get("id")?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Invalid song id '{}': {}", id_str, e)))?;

    Ok(Song {
        id,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        release_date: row.try_get("release_date")?,
        artwork_url: row.try_get("artwork_url")?,
        language: row.try_get("language")?,
        url: row.try_get("url")?,
        path: row.try_get("path")?,
        has_details: row.try_get("has_details")?,
        has_lyrics: row.try_get("has_lyrics")?,
        has_referents: row.try_get("has_referents")?,
    })
}

fn songs_from_rows(rows: &[SqliteRow]) -> Result<Vec<Song>> {
    rows.iter().map(song_from_row).collect()
}

/// Save song to database (insert or update by id)
pub async fn save_song(pool: &SqlitePool, song: &Song) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO songs (
            id, external_id, title, artist, album, release_date, artwork_url,
            language, url, path, has_details, has_lyrics, has_referents,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(id) DO UPDATE SET
            external_id = excluded.external_id,
            title = excluded.title,
            artist = excluded.artist,
            album = excluded.album,
            release_date = excluded.release_date,
            artwork_url = excluded.artwork_url,
            language = excluded.language,
            url = excluded.url,
            path = excluded.path,
            has_details = excluded.has_details,
            has_lyrics = excluded.has_lyrics,
            has_referents = excluded.has_referents,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(song.id.to_string())
    .bind(song.external_id)
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.release_date)
    .bind(&song.artwork_url)
    .bind(&song.language)
    .bind(&song.url)
    .bind(&song.path)
    .bind(song.has_details)
    .bind(song.has_lyrics)
    .bind(song.has_referents)
    .execute(&mut *tx)
    .await?;

    index_song_text(&mut tx, song.id, &song.title, &song.artist).await?;
    tx.commit().await?;

    Ok(())
}

/// Upsert a provider hit by its external id and return the stored row
///
/// Metadata fields are refreshed on conflict; optional fields the hit does
/// not carry keep their stored value. Content flags are left untouched.
pub async fn upsert_hit(pool: &SqlitePool, hit: &SongHit) -> Result<Song> {
    let sql = format!(
        r#"
        INSERT INTO songs (
            id, external_id, title, artist, album, release_date, artwork_url,
            language, url, path, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(external_id) DO UPDATE SET
            title = excluded.title,
            artist = excluded.artist,
            album = COALESCE(excluded.album, songs.album),
            release_date = COALESCE(excluded.release_date, songs.release_date),
            artwork_url = COALESCE(excluded.artwork_url, songs.artwork_url),
            language = COALESCE(excluded.language, songs.language),
            url = COALESCE(excluded.url, songs.url),
            path = COALESCE(excluded.path, songs.path),
            updated_at = CURRENT_TIMESTAMP
        RETURNING {}
        "#,
        SONG_COLUMNS
    );

    let mut tx = pool.begin().await?;

    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(hit.external_id)
        .bind(&hit.title)
        .bind(&hit.artist)
        .bind(&hit.album)
        .bind(&hit.release_date)
        .bind(&hit.artwork_url)
        .bind(&hit.language)
        .bind(&hit.url)
        .bind(&hit.path)
        .fetch_one(&mut *tx)
        .await?;
    let song = song_from_row(&row)?;

    index_song_text(&mut tx, song.id, &song.title, &song.artist).await?;
    tx.commit().await?;

    Ok(song)
}

/// Rewrite the folded columns and trigram rows of one song
async fn index_song_text(
    conn: &mut SqliteConnection,
    id: Uuid,
    title: &str,
    artist: &str,
) -> Result<()> {
    let id = id.to_string();

    sqlx::query("UPDATE songs SET title_folded = ?, artist_folded = ? WHERE id = ?")
        .bind(fold_case(title))
        .bind(fold_case(artist))
        .bind(&id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM song_trigrams WHERE song_id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await?;

    let entries: Vec<(i64, String)> = trigram_keys(title)
        .into_iter()
        .map(|t| (TITLE_FIELD, t))
        .chain(trigram_keys(artist).into_iter().map(|t| (ARTIST_FIELD, t)))
        .collect();
    if entries.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO song_trigrams (trigram, field, song_id) ");
    builder.push_values(entries, |mut b, (field, trigram)| {
        b.push_bind(trigram).push_bind(field).push_bind(id.clone());
    });
    builder.build().execute(&mut *conn).await?;

    Ok(())
}

/// Index songs written without the search index (`title_folded IS NULL`)
///
/// Rows inserted by other writers become visible to search once indexed.
/// Returns the number of songs indexed.
pub async fn index_unindexed_songs(pool: &SqlitePool) -> Result<u64> {
    let rows = sqlx::query("SELECT id, title, artist FROM songs WHERE title_folded IS NULL")
        .fetch_all(pool)
        .await?;

    let mut indexed = 0;
    for row in &rows {
        let id_str: String = row.try_get("id")?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| Error::Internal(format!("Invalid song id '{}': {}", id_str, e)))?;
        let title: String = row.try_get("title")?;
        let artist: String = row.try_get("artist")?;

        let mut tx = pool.begin().await?;
        index_song_text(&mut tx, id, &title, &artist).await?;
        tx.commit().await?;
        indexed += 1;
    }

    if indexed > 0 {
        tracing::info!(count = indexed, "Indexed songs for search");
    }
    Ok(indexed)
}

/// Load song by id
///
/// Returns `Error::NotFound` when no song has this id.
pub async fn load_song(pool: &SqlitePool, id: Uuid) -> Result<Song> {
    let sql = format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => song_from_row(&row),
        None => Err(Error::NotFound(format!("Song {}", id))),
    }
}

/// Load song by provider id
pub async fn load_song_by_external_id(pool: &SqlitePool, external_id: i64) -> Result<Option<Song>> {
    let sql = format!("SELECT {} FROM songs WHERE external_id = ?", SONG_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(external_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(song_from_row).transpose()
}

/// Push `id IN (songs sharing enough trigrams with the query in one field)`
///
/// Pushes a false predicate when the query has no trigrams.
fn push_trigram_candidates(builder: &mut QueryBuilder<'_, Sqlite>, trigram: &TrigramQuery, threshold: f64) {
    if trigram.is_empty() {
        builder.push("0");
        return;
    }

    builder.push("id IN (SELECT song_id FROM song_trigrams WHERE trigram IN (");
    let mut keys = builder.separated(", ");
    for key in trigram.keys() {
        keys.push_bind(key);
    }
    builder.push(") GROUP BY song_id, field HAVING COUNT(*) >= ");
    builder.push_bind(trigram.min_shared(threshold) as i64);
    builder.push(")");
}

fn rank_by_score(mut scored: Vec<ScoredSong>, limit: usize) -> Vec<ScoredSong> {
    // Stable sort keeps store order among equal scores
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

/// Songs whose title or artist is trigram-similar to `query`
///
/// Score is the greater of the title and artist similarity; results are
/// at or above `threshold`, best first. Candidates come from the
/// `song_trigrams` index and are rescored exactly.
pub async fn similar_songs(
    pool: &SqlitePool,
    query: &str,
    threshold: f64,
    limit: usize,
) -> Result<Vec<ScoredSong>> {
    let trigram = TrigramQuery::new(query);

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    builder.push(SONG_COLUMNS);
    builder.push(" FROM songs WHERE has_details = 1 AND ");
    push_trigram_candidates(&mut builder, &trigram, threshold);

    let rows = builder.build().fetch_all(pool).await?;

    let scored = songs_from_rows(&rows)?
        .into_iter()
        .filter_map(|song| {
            let score = trigram.best_of(&song.title, &song.artist);
            (score >= threshold).then_some(ScoredSong { song, score })
        })
        .collect();

    Ok(rank_by_score(scored, limit))
}

/// Songs that are trigram-similar to `query` or contain it in title or artist
pub async fn similar_or_containing_songs(
    pool: &SqlitePool,
    query: &str,
    threshold: f64,
    limit: usize,
) -> Result<Vec<ScoredSong>> {
    let trigram = TrigramQuery::new(query);
    let needle = fold_case(query);
    let pattern = format!("%{}%", escape_like(&needle));

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    builder.push(SONG_COLUMNS);
    builder.push(" FROM songs WHERE has_details = 1 AND (");
    push_trigram_candidates(&mut builder, &trigram, threshold);
    builder.push(" OR title_folded LIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" ESCAPE '\\' OR artist_folded LIKE ");
    builder.push_bind(pattern);
    builder.push(" ESCAPE '\\')");

    let rows = builder.build().fetch_all(pool).await?;

    let scored = songs_from_rows(&rows)?
        .into_iter()
        .filter_map(|song| {
            let score = trigram.best_of(&song.title, &song.artist);
            let contains = fold_case(&song.title).contains(&needle)
                || fold_case(&song.artist).contains(&needle);
            (score >= threshold || contains).then_some(ScoredSong { song, score })
        })
        .collect();

    Ok(rank_by_score(scored, limit))
}

/// Songs whose title or artist contains `needle` (case-insensitive)
pub async fn songs_containing(pool: &SqlitePool, needle: &str, limit: usize) -> Result<Vec<Song>> {
    let pattern = format!("%{}%", escape_like(&fold_case(needle)));
    let sql = format!(
        r#"
        SELECT {} FROM songs
        WHERE has_details = 1
          AND (title_folded LIKE ? ESCAPE '\' OR artist_folded LIKE ? ESCAPE '\')
        ORDER BY title, artist
        LIMIT ?
        "#,
        SONG_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    songs_from_rows(&rows)
}

/// Songs whose title or artist contains any of `words` (case-insensitive)
///
/// Returns nothing without querying when `words` is empty.
pub async fn songs_containing_any(
    pool: &SqlitePool,
    words: &[String],
    limit: usize,
) -> Result<Vec<Song>> {
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT ");
    builder.push(SONG_COLUMNS);
    builder.push(" FROM songs WHERE has_details = 1 AND (");

    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        let pattern = format!("%{}%", escape_like(&fold_case(word)));
        builder.push("title_folded LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR artist_folded LIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\'");
    }

    builder.push(") ORDER BY title, artist LIMIT ");
    builder.push_bind(limit as i64);

    let rows = builder.build().fetch_all(pool).await?;
    songs_from_rows(&rows)
}

/// Songs whose title or artist starts with `prefix` (case-insensitive)
///
/// Content-rich songs come first.
pub async fn songs_with_prefix(pool: &SqlitePool, prefix: &str, limit: usize) -> Result<Vec<Song>> {
    let pattern = format!("{}%", escape_like(&fold_case(prefix)));
    let sql = format!(
        r#"
        SELECT {} FROM songs
        WHERE has_details = 1
          AND (title_folded LIKE ? ESCAPE '\' OR artist_folded LIKE ? ESCAPE '\')
        ORDER BY has_lyrics DESC, has_referents DESC, title
        LIMIT ?
        "#,
        SONG_COLUMNS
    );

    let rows = sqlx::query(&sql)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

    songs_from_rows(&rows)
}

/// Most recently updated songs that have details
pub async fn recently_detailed_songs(pool: &SqlitePool, limit: usize) -> Result<Vec<Song>> {
    let sql = format!(
        "SELECT {} FROM songs WHERE has_details = 1 ORDER BY updated_at DESC LIMIT ?",
        SONG_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(limit as i64).fetch_all(pool).await?;
    songs_from_rows(&rows)
}
