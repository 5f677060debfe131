//! Test Helper Utilities
//!
//! Shared fixtures for lyra-search integration tests: an in-memory store,
//! seeded songs, and a scripted remote provider that records its calls.

#![allow(dead_code)]

use async_trait::async_trait;
use lyra_common::config::SearchSettings;
use lyra_search::db::songs::{save_song, Song};
use lyra_search::models::SongHit;
use lyra_search::services::{ProviderError, RemoteSongProvider, SearchOrchestrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory database with the lyra tables
///
/// A single connection keeps every query on the same in-memory database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    lyra_search::db::init_tables(&pool).await.unwrap();
    pool
}

/// Save a song that has details (visible to local search)
pub async fn seed_song(pool: &SqlitePool, title: &str, artist: &str) -> Song {
    let mut song = Song::new(title, artist);
    song.has_details = true;
    save_song(pool, &song).await.unwrap();
    song
}

/// Save a detailed song with content flags
pub async fn seed_song_with_content(
    pool: &SqlitePool,
    title: &str,
    artist: &str,
    has_lyrics: bool,
    has_referents: bool,
) -> Song {
    let mut song = Song::new(title, artist);
    song.has_details = true;
    song.has_lyrics = has_lyrics;
    song.has_referents = has_referents;
    save_song(pool, &song).await.unwrap();
    song
}

/// Four songs that are all high-similarity matches for "bohemian rhapsody"
pub async fn seed_bohemian_library(pool: &SqlitePool) -> Vec<Song> {
    let songs = vec![
        seed_song(pool, "Bohemian Rhapsody", "Queen").await,
        seed_song(pool, "Bohemian Rhapsody", "Panic! at the Disco").await,
        seed_song(pool, "Bohemian Rhapsody Live Aid", "Queen").await,
        seed_song(pool, "Bohemian Rhapsody Live", "Queen").await,
    ];
    seed_song(pool, "Creep", "Radiohead").await;
    seed_song(pool, "Under Pressure", "Queen").await;
    songs
}

pub fn hit(external_id: i64, title: &str, artist: &str) -> SongHit {
    SongHit {
        external_id,
        title: title.to_string(),
        artist: artist.to_string(),
        album: None,
        release_date: None,
        artwork_url: None,
        language: Some("en".to_string()),
        url: Some(format!("https://genius.com/songs/{}", external_id)),
        path: None,
    }
}

/// Scripted remote provider
pub struct MockProvider {
    hits: Vec<SongHit>,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl MockProvider {
    /// Provider answering every search with `hits`
    pub fn returning(hits: Vec<SongHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Provider failing every search with a network error
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            fail: true,
            delay: None,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Provider that waits before answering
    pub fn slow(hits: Vec<SongHit>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail: false,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSongProvider for MockProvider {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<SongHit>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(ProviderError::NetworkError("connection refused".to_string()));
        }
        Ok(self.hits.clone())
    }
}

/// Orchestrator over `pool` with default settings
pub fn orchestrator(pool: &SqlitePool, provider: Arc<MockProvider>) -> SearchOrchestrator {
    SearchOrchestrator::from_settings(pool.clone(), provider, &SearchSettings::default())
}
