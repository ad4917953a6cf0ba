//! Processing service status and control
//!
//! GET /remote/status, POST /system/shutdown

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{error::ApiResult, gateway::ShutdownAck, AppState};

/// GET /remote/status response
///
/// Failures are reported in the body rather than as an error status so a
/// front end can always render the panel.
#[derive(Debug, Serialize)]
pub struct RemoteStatusResponse {
    /// "ok", or the health endpoint's own status string
    pub service: String,
    pub service_online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_error: Option<String>,
    pub metadata_online: bool,
    pub metadata_message: String,
}

/// GET /remote/status
pub async fn remote_status(State(state): State<AppState>) -> Json<RemoteStatusResponse> {
    let (service, service_online, service_error) = match state.gateway.health().await {
        Ok(health) => {
            let online = health.status.eq_ignore_ascii_case("ok");
            (health.status, online, None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Processing service health check failed");
            ("unreachable".to_string(), false, Some(e.detail()))
        }
    };

    let (metadata_online, metadata_message) = match state.gateway.metadata_connectivity().await {
        Ok(connectivity) => (connectivity.is_online(), connectivity.message),
        Err(e) => (false, e.detail()),
    };

    Json(RemoteStatusResponse {
        service,
        service_online,
        service_error,
        metadata_online,
        metadata_message,
    })
}

/// POST /system/shutdown
///
/// Forwards the shutdown command to the processing service.
pub async fn shutdown_service(State(state): State<AppState>) -> ApiResult<Json<ShutdownAck>> {
    tracing::warn!("Forwarding shutdown request to processing service");
    let ack = state.gateway.shutdown().await?;
    Ok(Json(ack))
}

/// Build remote routes
pub fn remote_routes() -> Router<AppState> {
    Router::new()
        .route("/remote/status", get(remote_status))
        .route("/system/shutdown", post(shutdown_service))
}
