//! Local Search Engine
//!
//! Runs three predicate queries against the song store concurrently and
//! merges them by strict tier priority:
//!
//! 1. **Similarity** - trigram similarity to title or artist, best first
//! 2. **Medium** - whole query as a substring of title or artist
//! 3. **Low** - any query word (3+ characters) as a substring
//!
//! The first tier a song appears in decides its position; completion order
//! of the queries never matters. Query failures are not handled here.

use lyra_common::config::SearchSettings;
use lyra_common::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::db::songs::{self, ScoredSong, Song};
use crate::models::SearchSongDto;
use crate::services::query_normalizer::significant_words;

/// Merged local result set with similarity statistics
#[derive(Debug, Clone, Default)]
pub struct LocalSearchResult {
    pub songs: Vec<SearchSongDto>,
    /// Similarity-tier matches at or above the high threshold
    pub high_count: usize,
    /// Similarity-tier matches between the low and high thresholds
    pub medium_count: usize,
}

/// Local Search Engine
#[derive(Clone)]
pub struct LocalSearchEngine {
    pool: SqlitePool,
    max_results: usize,
    high_similarity: f64,
    low_similarity: f64,
}

impl LocalSearchEngine {
    pub fn new(pool: SqlitePool, settings: &SearchSettings) -> Self {
        Self {
            pool,
            max_results: settings.max_results,
            high_similarity: settings.high_similarity,
            low_similarity: settings.low_similarity,
        }
    }

    /// Search the store for a trimmed (original case) query
    pub async fn search(&self, trimmed_query: &str) -> Result<LocalSearchResult> {
        let limit = self.max_results;
        let words = significant_words(trimmed_query);

        let (similar, medium, low) = tokio::try_join!(
            songs::similar_songs(&self.pool, trimmed_query, self.low_similarity, limit),
            songs::songs_containing(&self.pool, trimmed_query, limit),
            songs::songs_containing_any(&self.pool, &words, limit),
        )?;

        let (high_count, medium_count) = self.similarity_counts(&similar);

        let similar_songs: Vec<Song> = similar.into_iter().map(|s| s.song).collect();
        let merged = merge_tiers(&[similar_songs, medium, low], limit);

        tracing::debug!(
            query = %trimmed_query,
            merged = merged.len(),
            high_count,
            medium_count,
            "Local search complete"
        );

        Ok(LocalSearchResult {
            songs: merged,
            high_count,
            medium_count,
        })
    }

    fn similarity_counts(&self, similar: &[ScoredSong]) -> (usize, usize) {
        similar.iter().fold((0, 0), |(high, medium), s| {
            if s.score >= self.high_similarity {
                (high + 1, medium)
            } else if s.score >= self.low_similarity {
                (high, medium + 1)
            } else {
                (high, medium)
            }
        })
    }
}

/// Merge tiers in order, first occurrence wins, stopping at `limit`
pub fn merge_tiers(tiers: &[Vec<Song>], limit: usize) -> Vec<SearchSongDto> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut merged = Vec::with_capacity(limit);

    for song in tiers.iter().flatten() {
        if merged.len() >= limit {
            break;
        }
        if seen.insert(song.id) {
            merged.push(song.to_dto());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(title: &str) -> Song {
        Song::new(title, "Artist")
    }

    #[test]
    fn test_merge_dedups_and_keeps_first_tier_position() {
        let a = song("A");
        let b = song("B");
        let c = song("C");
        let d = song("D");

        let tiers = vec![
            vec![a.clone(), b.clone()],
            vec![c.clone(), a.clone()],
            vec![b.clone(), d.clone(), c.clone()],
        ];
        let merged = merge_tiers(&tiers, 10);
        let ids: Vec<_> = merged.iter().map(|s| s.id).collect();

        assert_eq!(ids, vec![a.id, b.id, c.id, d.id]);
    }

    #[test]
    fn test_merge_stops_at_limit() {
        let tiers = vec![
            vec![song("A"), song("B")],
            vec![song("C"), song("D")],
            vec![song("E")],
        ];
        let merged = merge_tiers(&tiers, 3);
        let titles: Vec<_> = merged.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_merge_output_is_subset_without_duplicates() {
        let pool: Vec<Song> = (0..6).map(|i| song(&format!("S{}", i))).collect();
        let tiers = vec![
            vec![pool[0].clone(), pool[3].clone()],
            vec![pool[3].clone(), pool[1].clone(), pool[0].clone()],
            vec![pool[5].clone(), pool[1].clone()],
        ];

        for limit in 0..8 {
            let merged = merge_tiers(&tiers, limit);
            let ids: HashSet<_> = merged.iter().map(|s| s.id).collect();
            assert_eq!(ids.len(), merged.len(), "duplicate ids at limit {}", limit);
            assert!(merged.len() <= limit);
            for id in ids {
                assert!(tiers.iter().flatten().any(|s| s.id == id));
            }
        }
    }
}
