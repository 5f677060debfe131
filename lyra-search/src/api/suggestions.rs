//! Autocomplete endpoints

use crate::models::Suggestion;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Suggestions returned when the caller gives no limit
pub const DEFAULT_LIMIT: usize = 8;

/// Upper bound on the requested limit
pub const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PopularParams {
    pub limit: Option<usize>,
}

fn effective_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
}

/// GET /suggestions?q=...&limit=...
///
/// Queries shorter than two characters return an empty list.
pub async fn get_suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestionParams>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    let suggestions = state
        .suggestions
        .suggest(&params.q, effective_limit(params.limit))
        .await?;
    Ok(Json(suggestions))
}

/// GET /suggestions/popular?limit=...
pub async fn get_popular(
    State(state): State<AppState>,
    Query(params): Query<PopularParams>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    let suggestions = state
        .suggestions
        .popular(effective_limit(params.limit))
        .await?;
    Ok(Json(suggestions))
}

/// Build suggestion routes
pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/suggestions", get(get_suggestions))
        .route("/suggestions/popular", get(get_popular))
}
