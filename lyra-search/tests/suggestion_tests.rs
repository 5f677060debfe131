//! Suggestion engine integration tests

mod helpers;

use helpers::{create_test_pool, seed_song, seed_song_with_content};
use lyra_common::config::SearchSettings;
use lyra_search::models::{Confidence, SuggestionKind};
use lyra_search::services::{ResultCache, SuggestionEngine};
use sqlx::SqlitePool;

fn engine(pool: &SqlitePool) -> SuggestionEngine {
    let settings = SearchSettings::default();
    let cache = ResultCache::new(pool.clone(), settings.cache_ttl());
    SuggestionEngine::new(pool.clone(), cache, &settings)
}

#[tokio::test]
async fn test_cache_and_store_both_contribute() {
    let pool = create_test_pool().await;
    seed_song_with_content(&pool, "Creep", "Radiohead", true, false).await;
    seed_song(&pool, "Bohemian Rhapsody", "Queen").await;

    let engine = engine(&pool);
    let radio_ga_ga = {
        let mut song = lyra_search::db::songs::Song::new("Radio Ga Ga", "Queen");
        song.album = Some("The Works".to_string());
        song.to_dto()
    };
    let cache = ResultCache::new(pool.clone(), SearchSettings::default().cache_ttl());
    cache.put("radio", &[radio_ga_ga], Confidence::High).await.unwrap();

    let suggestions = engine.suggest("rad", 10).await.unwrap();
    let entries: Vec<_> = suggestions.iter().map(|s| (s.text.as_str(), s.kind)).collect();

    // Fresh cache entry: 1.5 + ~0.5; store artist prefix: 0.8 + 0.9 + 0.24
    assert_eq!(
        entries,
        vec![
            ("Radio Ga Ga", SuggestionKind::Song),
            ("Radiohead", SuggestionKind::Artist),
        ]
    );

    let metadata = suggestions[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.artist.as_deref(), Some("Queen"));
    assert_eq!(metadata.album.as_deref(), Some("The Works"));
}

#[tokio::test]
async fn test_short_query_returns_nothing() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Roxanne", "The Police").await;
    let engine = engine(&pool);

    assert!(engine.suggest("r", 10).await.unwrap().is_empty());
    assert!(engine.suggest("  ", 10).await.unwrap().is_empty());
    assert!(engine.suggest("ro", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exact_title_ranks_above_prefix() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Creep", "Radiohead").await;
    seed_song(&pool, "Creeping Death", "Metallica").await;
    let engine = engine(&pool);

    let suggestions = engine.suggest("Creep", 5).await.unwrap();
    let titles: Vec<_> = suggestions.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(titles, vec!["Creep", "Creeping Death"]);
}

#[tokio::test]
async fn test_duplicates_collapse_and_limit_applies() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Radio", "Corrs").await;
    seed_song(&pool, "Radio", "Rammstein").await;
    seed_song(&pool, "Radioactive", "Imagine Dragons").await;
    seed_song(&pool, "Radio Song", "R.E.M.").await;
    let engine = engine(&pool);

    let suggestions = engine.suggest("radio", 10).await.unwrap();
    let radio_titles = suggestions
        .iter()
        .filter(|s| s.kind == SuggestionKind::Song && s.text == "Radio")
        .count();
    assert_eq!(radio_titles, 1, "same title from two songs is one suggestion");

    let limited = engine.suggest("radio", 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_store_failure_without_fallback_is_an_error() {
    let pool = create_test_pool().await;
    let engine = engine(&pool);

    sqlx::query("DROP TABLE songs").execute(&pool).await.unwrap();

    assert!(engine.suggest("radio", 5).await.is_err());
}

#[tokio::test]
async fn test_popular_counts_occurrences() {
    let pool = create_test_pool().await;
    let radio_ga_ga = seed_song(&pool, "Radio Ga Ga", "Queen").await.to_dto();
    let bohemian = seed_song(&pool, "Bohemian Rhapsody", "Queen").await.to_dto();

    let cache = ResultCache::new(pool.clone(), SearchSettings::default().cache_ttl());
    cache
        .put("radio", &[radio_ga_ga.clone()], Confidence::High)
        .await
        .unwrap();
    cache
        .put("queen", &[radio_ga_ga, bohemian], Confidence::Medium)
        .await
        .unwrap();
    // Low-confidence rows are never written, ongoing ones are ignored
    cache.mark_in_flight("ignored").await.unwrap();

    let engine = engine(&pool);
    let popular = engine.popular(10).await.unwrap();

    // Radio Ga Ga: two cache entries plus the store; Bohemian Rhapsody: one plus the store
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].text, "Radio Ga Ga");
    let first = popular[0].metadata.as_ref().unwrap();
    assert_eq!(first.popularity, Some(3));
    assert_eq!(first.is_new, Some(false));
    assert_eq!(popular[1].text, "Bohemian Rhapsody");
    assert_eq!(popular[1].metadata.as_ref().unwrap().popularity, Some(2));
}

#[tokio::test]
async fn test_popular_marks_single_sightings_new() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Fresh Release", "New Artist").await;
    let engine = engine(&pool);

    let popular = engine.popular(5).await.unwrap();
    assert_eq!(popular.len(), 1);
    let metadata = popular[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.popularity, Some(1));
    assert_eq!(metadata.is_new, Some(true));
    assert_eq!(metadata.artist.as_deref(), Some("New Artist"));
}

#[tokio::test]
async fn test_non_ascii_prefix_suggestions() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Кукушка", "Кино").await;
    let engine = engine(&pool);

    let suggestions = engine.suggest("КУК", 5).await.unwrap();
    assert_eq!(suggestions[0].text, "Кукушка");
    assert_eq!(suggestions[0].kind, SuggestionKind::Song);

    let suggestions = engine.suggest("кин", 5).await.unwrap();
    assert!(suggestions
        .iter()
        .any(|s| s.text == "Кино" && s.kind == SuggestionKind::Artist));
}

#[tokio::test]
async fn test_unbounded_limit_does_not_overflow() {
    let pool = create_test_pool().await;
    seed_song(&pool, "Creep", "Radiohead").await;
    seed_song(&pool, "Creeping Death", "Metallica").await;
    let engine = engine(&pool);

    let suggestions = engine.suggest("creep", usize::MAX).await.unwrap();
    let titles: Vec<_> = suggestions.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(titles, vec!["Creep", "Creeping Death"]);
}
