//! Song search endpoint

use crate::models::SearchResponse;
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

/// Query parameters for `GET /search`
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Raw user query
    #[serde(default)]
    pub q: String,
    /// Skip the cache and always ask the remote provider
    #[serde(default)]
    pub force_remote: bool,
}

/// GET /search?q=...&force_remote=...
///
/// **Errors:**
/// - 400 Bad Request: blank query
/// - 500 Internal Server Error: local store failure
pub async fn search_songs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let response = state
        .orchestrator
        .search_songs(&params.q, params.force_remote)
        .await?;
    Ok(Json(response))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/search", get(search_songs))
}
