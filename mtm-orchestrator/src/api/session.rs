//! Session API handlers
//!
//! GET /session, GET /session/:view, GET /session/albums/:id/diff

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use mtm_common::events::{OrganizeOutcome, SessionCounters};
use mtm_common::Album;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{
    diff::{album_diff, TrackDiff},
    error::{ApiError, ApiResult},
    session::{PipelineStatus, SessionView},
    AppState,
};

/// GET /session response
#[derive(Debug, Serialize)]
pub struct SessionSummaryResponse {
    pub version: u64,
    pub run_id: Option<Uuid>,
    pub status: PipelineStatus,
    pub counters: SessionCounters,
    pub organize_progress: u8,
    pub manually_fixed: Vec<String>,
    pub organize_outcomes: BTreeMap<String, OrganizeOutcome>,
    /// Albums whose organize call failed in the last pass
    pub organize_failures: usize,
    pub albums_scanned: usize,
    pub albums_identified: usize,
    pub albums_tagged: usize,
}

/// GET /session/albums/:id/diff response
#[derive(Debug, Serialize)]
pub struct AlbumDiffResponse {
    pub album_id: String,
    pub tracks: Vec<TrackDiff>,
}

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSummaryResponse> {
    let session = state.store.snapshot();

    Json(SessionSummaryResponse {
        version: session.version,
        run_id: session.run_id,
        status: session.status.clone(),
        counters: session.counters,
        organize_progress: session.organize_progress,
        manually_fixed: session.manually_fixed.iter().cloned().collect(),
        organize_outcomes: session.organize_outcomes.clone(),
        organize_failures: session
            .organize_outcomes
            .values()
            .filter(|o| o.is_failed())
            .count(),
        albums_scanned: session.scanned.len(),
        albums_identified: session.identified.len(),
        albums_tagged: session.tagged.len(),
    })
}

/// GET /session/:view
pub async fn get_session_view(
    State(state): State<AppState>,
    Path(view): Path<String>,
) -> ApiResult<Json<Vec<Album>>> {
    let view: SessionView = view.parse().map_err(ApiError::NotFound)?;
    let session = state.store.snapshot();
    Ok(Json(session.albums(view).to_vec()))
}

/// GET /session/albums/:id/diff
pub async fn get_album_diff(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
) -> ApiResult<Json<AlbumDiffResponse>> {
    let session = state.store.snapshot();
    let tracks = album_diff(&session, &album_id).ok_or_else(|| {
        ApiError::NotFound(format!("No tagged album with id: {}", album_id))
    })?;

    tracing::debug!(album_id = %album_id, tracks = tracks.len(), "Diff computed");
    Ok(Json(AlbumDiffResponse { album_id, tracks }))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/:view", get(get_session_view))
        .route("/session/albums/:id/diff", get(get_album_diff))
}
