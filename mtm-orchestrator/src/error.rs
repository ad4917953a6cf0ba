//! Error types for mtm-orchestrator
//!
//! Stage-level failures abort the rest of a run and surface as a single
//! [`PipelineError`]. Item-level failures never appear here: they travel in
//! each album's status.

use crate::gateway::GatewayError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mtm_common::events::PipelineStage;
use serde_json::json;
use thiserror::Error;

/// Pipeline and resolution failures
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Missing locations or queries; nothing was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scan request failed; the session was left empty
    #[error("Scan failed: {0}")]
    Scan(String),

    /// Scan succeeded but found no albums
    #[error("No audio files found in: {0}")]
    NoFilesFound(String),

    /// Identify request failed as a whole
    #[error("Identify failed: {0}")]
    Identify(String),

    /// Tag request failed; earlier collections are kept for inspection
    #[error("Tag failed: {0}")]
    Tag(String),

    /// Manual resolution failed; the session was not touched
    #[error("Resolution failed: {0}")]
    Resolution(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Another pipeline operation is in progress
    #[error("Pipeline busy: {0}")]
    Busy(String),
}

impl PipelineError {
    /// Stage the failure belongs to, if it came from one
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::Scan(_) | PipelineError::NoFilesFound(_) => Some(PipelineStage::Scan),
            PipelineError::Identify(_) => Some(PipelineStage::Identify),
            PipelineError::Tag(_) => Some(PipelineStage::Tag),
            _ => None,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a run is already active
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The processing service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            PipelineError::NotFound(_) | PipelineError::NoFilesFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            PipelineError::Busy(_) => ApiError::Conflict(err.to_string()),
            PipelineError::Scan(_)
            | PipelineError::Identify(_)
            | PipelineError::Tag(_)
            | PipelineError::Resolution(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
