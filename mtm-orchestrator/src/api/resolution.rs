//! Manual resolution API handlers
//!
//! POST /resolution/search, GET /resolution/candidates, POST /resolution/resolve

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use mtm_common::Album;
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    resolution::SearchResults,
    AppState,
};

/// POST /resolution/search request
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
}

/// POST /resolution/resolve request
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub album_id: String,
    pub release_id: String,
}

/// POST /resolution/search
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Json<SearchResults>> {
    let results = state.resolution.search(&body.artist, &body.album).await?;
    Ok(Json(results))
}

/// GET /resolution/candidates
///
/// Results of the newest search, if any.
pub async fn latest_candidates(State(state): State<AppState>) -> ApiResult<Json<SearchResults>> {
    state
        .resolution
        .latest_candidates()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No search has completed yet".to_string()))
}

/// POST /resolution/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Json(body): Json<ResolveBody>,
) -> ApiResult<Json<Album>> {
    match state.resolution.resolve(&body.album_id, &body.release_id).await {
        Ok(album) => Ok(Json(album)),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// Build resolution routes
pub fn resolution_routes() -> Router<AppState> {
    Router::new()
        .route("/resolution/search", post(search))
        .route("/resolution/candidates", get(latest_candidates))
        .route("/resolution/resolve", post(resolve))
}
