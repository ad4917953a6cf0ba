//! Remote Processing Gateway
//!
//! The album processing service does all file-system scanning, MusicBrainz
//! querying, tag writing and file moving. The orchestrator only sequences
//! calls to it through this trait, so the pipeline can be driven against the
//! HTTP service in production and a scripted fake in tests.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use mtm_common::{Album, CandidateRelease};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The request never produced a response (connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Detail suitable for showing the user: the response body when there is one
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Status { status, body } if body.trim().is_empty() => {
                format!("HTTP {}", status)
            }
            GatewayError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// `scan` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub input_path: String,
    pub output_path: String,
}

/// `identify/search` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub artist: String,
    pub album: String,
}

/// `identify/resolve` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub album: Album,
    pub mb_release_id: String,
}

/// `organize` request; the orchestrator always sends exactly one album
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeRequest {
    pub albums: Vec<Album>,
    pub output_path: String,
}

/// `organize` acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrganizeAck {
    #[serde(default)]
    pub attempted: usize,
    #[serde(default)]
    pub moved: usize,
}

/// `health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
}

/// Metadata-service connectivity as seen by the processing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connectivity {
    /// "online" or "offline"
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl Connectivity {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

/// Shutdown acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownAck {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Abstract album processing service
///
/// Every method is one remote call; callers await each one before issuing
/// the next. No method retries.
#[async_trait]
pub trait ProcessingGateway: Send + Sync {
    /// Discover albums under the input location
    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Album>, GatewayError>;

    /// Identify a batch; per-album failures come back in each album's status
    async fn identify(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError>;

    /// Search the metadata service for candidate releases
    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidateRelease>, GatewayError>;

    /// Bind an album to an explicit release and fetch its metadata
    async fn resolve(&self, album: &Album, release_id: &str) -> Result<Album, GatewayError>;

    /// Write tags for a batch of albums
    async fn tag(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError>;

    /// Move albums into the output tree
    async fn organize(&self, request: &OrganizeRequest) -> Result<OrganizeAck, GatewayError>;

    /// Liveness of the processing service itself
    async fn health(&self) -> Result<ServiceHealth, GatewayError>;

    /// Whether the processing service can reach the metadata service
    async fn metadata_connectivity(&self) -> Result<Connectivity, GatewayError>;

    /// Ask the processing service to shut down
    async fn shutdown(&self) -> Result<ShutdownAck, GatewayError>;
}
