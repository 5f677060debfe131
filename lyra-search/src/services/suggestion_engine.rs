//! Suggestion Engine
//!
//! Autocomplete over two independent candidate sources:
//!
//! - **Cache-derived**: songs inside trusted cache entries whose key starts
//!   with the query, boosted by how recently the entry was written.
//! - **Store-derived**: prefix and similarity-or-substring queries against
//!   songs with details, scored by match quality and content richness.
//!
//! Candidates merge into one set keyed by `type:text` keeping the best
//! score. If the store-derived phase fails the engine falls back to a plain
//! prefix query. This pipeline never calls the remote provider.

use async_trait::async_trait;
use chrono::Utc;
use lyra_common::config::SearchSettings;
use lyra_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::db::songs::{self, ScoredSong, Song};
use crate::models::{Suggestion, SuggestionKind, SuggestionMetadata};
use crate::services::query_normalizer::normalize;
use crate::services::result_cache::ResultCache;
use crate::utils::fold_case;

/// Queries shorter than this (after normalization) get no suggestions
pub const MIN_QUERY_CHARS: usize = 2;

const CACHE_TITLE_BASE: f64 = 1.5;
const CACHE_ARTIST_BASE: f64 = 1.3;
const RECENCY_WEIGHT: f64 = 0.5;
const RECENCY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

const TITLE_BASE: f64 = 1.0;
const ARTIST_BASE: f64 = 0.8;
const SUBSTRING_BONUS: f64 = 0.7;
const OTHER_FIELD_PREFIX_BONUS: f64 = 0.1;
const LYRICS_BONUS: f64 = 0.8;
const REFERENTS_BONUS: f64 = 0.2;
const TITLE_CONTENT_SCALE: f64 = 0.5;
const ARTIST_CONTENT_SCALE: f64 = 0.3;

/// Share of the store candidate budget given to the prefix query
const PREFIX_SHARE: f64 = 0.7;

/// Popular entries seen at most this often are flagged as new
const NEW_MAX_COUNT: u32 = 1;

/// How a field matches the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Exact,
    Prefix,
    Substring,
    None,
}

impl MatchQuality {
    /// Compare `text` against an already lowercased query
    pub fn of(text: &str, query_lower: &str) -> Self {
        let text = fold_case(text);
        if text == query_lower {
            MatchQuality::Exact
        } else if text.starts_with(query_lower) {
            MatchQuality::Prefix
        } else if text.contains(query_lower) {
            MatchQuality::Substring
        } else {
            MatchQuality::None
        }
    }

    fn is_prefix(&self) -> bool {
        matches!(self, MatchQuality::Exact | MatchQuality::Prefix)
    }
}

/// Similarity threshold for the store-derived query, by query length
pub fn similarity_threshold(query_chars: usize) -> f64 {
    if query_chars >= 4 {
        0.3
    } else if query_chars >= 3 {
        0.25
    } else {
        0.6
    }
}

/// Recency bonus for a cache entry of the given age
///
/// Linear decay from `RECENCY_WEIGHT` to zero over 24 hours.
pub fn recency_bonus(age: Duration) -> f64 {
    let remaining = 1.0 - age.as_secs_f64() / RECENCY_WINDOW.as_secs_f64();
    RECENCY_WEIGHT * remaining.max(0.0)
}

/// Score of a store-derived suggestion
///
/// * `quality` - how this field matches the query
/// * `other_field_prefix` - the song's other field also starts with the query
pub fn store_score(
    kind: SuggestionKind,
    quality: MatchQuality,
    other_field_prefix: bool,
    has_lyrics: bool,
    has_referents: bool,
) -> f64 {
    let (base, exact, prefix, content_scale) = match kind {
        SuggestionKind::Song => (TITLE_BASE, 1.2, 1.0, TITLE_CONTENT_SCALE),
        SuggestionKind::Artist => (ARTIST_BASE, 1.1, 0.9, ARTIST_CONTENT_SCALE),
    };

    let mut match_bonus = match quality {
        MatchQuality::Exact => exact,
        MatchQuality::Prefix => prefix,
        MatchQuality::Substring => SUBSTRING_BONUS,
        MatchQuality::None => 0.0,
    };
    if quality != MatchQuality::None && other_field_prefix {
        match_bonus += OTHER_FIELD_PREFIX_BONUS;
    }

    let mut content = 0.0;
    if has_lyrics {
        content += LYRICS_BONUS;
    }
    if has_referents {
        content += REFERENTS_BONUS;
    }

    base + match_bonus + content * content_scale
}

fn song_metadata(artist: &str, album: Option<&str>) -> Option<SuggestionMetadata> {
    Some(SuggestionMetadata {
        artist: Some(artist.to_string()),
        album: album.map(str::to_string),
        ..Default::default()
    })
}

/// Suggestions keyed by `type:text`, keeping the best score and the
/// position of first insertion
#[derive(Debug, Default)]
struct SuggestionSet {
    entries: Vec<Suggestion>,
    index: HashMap<String, usize>,
}

impl SuggestionSet {
    fn offer(&mut self, suggestion: Suggestion) {
        let key = suggestion.key();
        match self.index.get(&key) {
            Some(&pos) => {
                if suggestion.score > self.entries[pos].score {
                    self.entries[pos] = suggestion;
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(suggestion);
            }
        }
    }

    fn extend(&mut self, suggestions: impl IntoIterator<Item = Suggestion>) {
        for suggestion in suggestions {
            self.offer(suggestion);
        }
    }

    /// Best first; ties keep insertion order
    fn into_ranked(mut self, limit: usize) -> Vec<Suggestion> {
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Song store queries the suggestion engine draws candidates from
#[async_trait]
pub trait SongCandidates: Send + Sync {
    /// Detailed songs whose title or artist starts with `prefix`
    async fn with_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<Song>>;

    /// Detailed songs similar to or containing `query`, best first
    async fn similar_or_containing(
        &self,
        query: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ScoredSong>>;

    /// Most recently updated detailed songs
    async fn recently_detailed(&self, limit: usize) -> Result<Vec<Song>>;
}

/// `SongCandidates` backed by the songs table
#[derive(Clone)]
pub struct SongStore {
    pool: SqlitePool,
}

impl SongStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongCandidates for SongStore {
    async fn with_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<Song>> {
        songs::songs_with_prefix(&self.pool, prefix, limit).await
    }

    async fn similar_or_containing(
        &self,
        query: &str,
        threshold: f64,
        limit: usize,
    ) -> Result<Vec<ScoredSong>> {
        songs::similar_or_containing_songs(&self.pool, query, threshold, limit).await
    }

    async fn recently_detailed(&self, limit: usize) -> Result<Vec<Song>> {
        songs::recently_detailed_songs(&self.pool, limit).await
    }
}

/// Suggestion Engine
#[derive(Clone)]
pub struct SuggestionEngine {
    songs: Arc<dyn SongCandidates>,
    cache: ResultCache,
    cache_sample: usize,
    popular_sample: usize,
}

impl SuggestionEngine {
    pub fn new(pool: SqlitePool, cache: ResultCache, settings: &SearchSettings) -> Self {
        Self::with_candidates(Arc::new(SongStore::new(pool)), cache, settings)
    }

    /// Engine drawing store candidates from `songs`
    pub fn with_candidates(
        songs: Arc<dyn SongCandidates>,
        cache: ResultCache,
        settings: &SearchSettings,
    ) -> Self {
        Self {
            songs,
            cache,
            cache_sample: settings.suggestion_cache_sample,
            popular_sample: settings.popular_cache_sample,
        }
    }

    /// Ranked autocomplete suggestions for a partial query
    ///
    /// # Errors
    /// Only when both the store-derived phase and its prefix-only fallback
    /// fail.
    pub async fn suggest(&self, query: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let q = normalize(query);
        if q.chars().count() < MIN_QUERY_CHARS || limit == 0 {
            return Ok(Vec::new());
        }

        let (from_cache, from_store) =
            tokio::join!(self.cache_candidates(&q), self.store_candidates(&q, limit));

        let from_store = match from_store {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(query = %q, error = %e, "Suggestion store query failed, using prefix-only fallback");
                self.prefix_only_candidates(&q, limit).await?
            }
        };

        debug!(
            query = %q,
            cache_candidates = from_cache.len(),
            store_candidates = from_store.len(),
            "Merging suggestion candidates"
        );

        let mut set = SuggestionSet::default();
        set.extend(from_cache);
        set.extend(from_store);

        Ok(set.into_ranked(limit))
    }

    /// Candidates from trusted cache entries whose key starts with `q`
    ///
    /// Cache problems only cost candidates, never the request.
    async fn cache_candidates(&self, q: &str) -> Vec<Suggestion> {
        let entries = match self.cache.entries_with_prefix(q, self.cache_sample).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(query = %q, error = %e, "Suggestion cache scan failed");
                return Vec::new();
            }
        };

        let now = Utc::now();
        let mut suggestions = Vec::new();

        for entry in entries {
            let bonus = recency_bonus(entry.age(now));
            for song in &entry.songs {
                if fold_case(&song.title).starts_with(q) {
                    suggestions.push(Suggestion::new(
                        song.title.clone(),
                        SuggestionKind::Song,
                        song_metadata(&song.artist, song.album.as_deref()),
                        CACHE_TITLE_BASE + bonus,
                    ));
                }
                if fold_case(&song.artist).starts_with(q) {
                    suggestions.push(Suggestion::new(
                        song.artist.clone(),
                        SuggestionKind::Artist,
                        None,
                        CACHE_ARTIST_BASE + bonus,
                    ));
                }
            }
        }

        suggestions
    }

    /// Candidates from the song store, scored by match quality and content
    async fn store_candidates(&self, q: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let budget = limit.saturating_mul(2);
        let prefix_limit = ((budget as f64) * PREFIX_SHARE).ceil() as usize;
        let similar_limit = budget.saturating_sub(prefix_limit);
        let threshold = similarity_threshold(q.chars().count());

        let (prefixed, similar) = tokio::try_join!(
            self.songs.with_prefix(q, prefix_limit),
            self.songs.similar_or_containing(q, threshold, similar_limit),
        )?;

        let candidates = prefixed
            .iter()
            .chain(similar.iter().map(|s| &s.song))
            .flat_map(|song| scored_suggestions(song, q))
            .collect();

        Ok(candidates)
    }

    /// Degraded path: prefix matches only, flat scores
    async fn prefix_only_candidates(&self, q: &str, limit: usize) -> Result<Vec<Suggestion>> {
        let songs = self.songs.with_prefix(q, limit.saturating_mul(2)).await?;

        let mut suggestions = Vec::new();
        for song in songs {
            if fold_case(&song.title).starts_with(q) {
                suggestions.push(Suggestion::new(
                    song.title.clone(),
                    SuggestionKind::Song,
                    song_metadata(&song.artist, song.album.as_deref()),
                    TITLE_BASE,
                ));
            }
            if fold_case(&song.artist).starts_with(q) {
                suggestions.push(Suggestion::new(
                    song.artist,
                    SuggestionKind::Artist,
                    None,
                    ARTIST_BASE,
                ));
            }
        }

        Ok(suggestions)
    }

    /// Suggestions for the empty-query landing state
    ///
    /// Ranks song titles by how often they occur across recent trusted cache
    /// entries and recently enriched songs. Entries seen once are marked new.
    pub async fn popular(&self, limit: usize) -> Result<Vec<Suggestion>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let (entries, recent) = tokio::join!(
            self.cache.recent_entries(self.popular_sample),
            self.songs.recently_detailed(limit),
        );

        let entries = entries.unwrap_or_else(|e| {
            warn!(error = %e, "Popular suggestions: cache scan failed");
            Vec::new()
        });
        let recent = recent.unwrap_or_else(|e| {
            warn!(error = %e, "Popular suggestions: recent songs query failed");
            Vec::new()
        });

        let mut counts: Vec<(String, Option<String>, Option<String>, u32)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut count = |title: &str, artist: &str, album: Option<&str>| {
            let key = fold_case(title);
            match index.get(&key) {
                Some(&pos) => counts[pos].3 += 1,
                None => {
                    index.insert(key, counts.len());
                    counts.push((
                        title.to_string(),
                        Some(artist.to_string()),
                        album.map(str::to_string),
                        1,
                    ));
                }
            }
        };

        for entry in &entries {
            for song in &entry.songs {
                count(&song.title, &song.artist, song.album.as_deref());
            }
        }
        for song in &recent {
            count(&song.title, &song.artist, song.album.as_deref());
        }

        let mut ranked = counts;
        ranked.sort_by(|a, b| b.3.cmp(&a.3));
        ranked.truncate(limit);

        Ok(ranked
            .into_iter()
            .map(|(title, artist, album, occurrences)| {
                Suggestion::new(
                    title,
                    SuggestionKind::Song,
                    Some(SuggestionMetadata {
                        artist,
                        album,
                        popularity: Some(occurrences),
                        is_new: Some(occurrences <= NEW_MAX_COUNT),
                    }),
                    occurrences as f64,
                )
            })
            .collect())
    }
}

/// Title and/or artist suggestions for one store candidate
///
/// A field is suggested when it matches the query; a song that matched only
/// by similarity is suggested by title.
fn scored_suggestions(song: &Song, q: &str) -> Vec<Suggestion> {
    let title_quality = MatchQuality::of(&song.title, q);
    let artist_quality = MatchQuality::of(&song.artist, q);
    let mut suggestions = Vec::with_capacity(2);

    if title_quality != MatchQuality::None || artist_quality == MatchQuality::None {
        suggestions.push(Suggestion::new(
            song.title.clone(),
            SuggestionKind::Song,
            song_metadata(&song.artist, song.album.as_deref()),
            store_score(
                SuggestionKind::Song,
                title_quality,
                artist_quality.is_prefix(),
                song.has_lyrics,
                song.has_referents,
            ),
        ));
    }

    if artist_quality != MatchQuality::None {
        suggestions.push(Suggestion::new(
            song.artist.clone(),
            SuggestionKind::Artist,
            None,
            store_score(
                SuggestionKind::Artist,
                artist_quality,
                title_quality.is_prefix(),
                song.has_lyrics,
                song.has_referents,
            ),
        ));
    }

    suggestions
}
