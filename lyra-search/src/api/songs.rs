//! Song lookup endpoint

use crate::db::songs::load_song;
use crate::models::SearchSongDto;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

/// GET /songs/:id
///
/// **Errors:**
/// - 400 Bad Request: id is not a UUID
/// - 404 Not Found: no song with that id
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SearchSongDto>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::BadRequest(format!("Invalid song id: {}", id)))?;
    let song = load_song(&state.db, id).await?;
    Ok(Json(song.to_dto()))
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new().route("/songs/:id", get(get_song))
}
