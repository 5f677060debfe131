//! lyra-search library interface
//!
//! Exposes the search services and the HTTP router for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use lyra_common::config::SearchSettings;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{RemoteSongProvider, SearchOrchestrator, SuggestionEngine};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub orchestrator: SearchOrchestrator,
    pub suggestions: SuggestionEngine,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn RemoteSongProvider>,
        settings: &SearchSettings,
    ) -> Self {
        let orchestrator = SearchOrchestrator::from_settings(db.clone(), provider, settings);
        let suggestions =
            SuggestionEngine::new(db.clone(), orchestrator.cache().clone(), settings);

        Self {
            db,
            orchestrator,
            suggestions,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::search_routes())
        .merge(api::suggestion_routes())
        .merge(api::song_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
