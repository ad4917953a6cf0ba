//! mtm-orchestrator library interface
//!
//! Client-side orchestrator for a music tagging service: drives the
//! Scan → Identify → Tag → Organize pipeline against the remote processing
//! service, keeps the album session, and exposes both over HTTP + SSE.

pub mod api;
pub mod config;
pub mod diff;
pub mod error;
pub mod focus;
pub mod gateway;
pub mod logging;
pub mod pipeline;
pub mod resolution;
pub mod session;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use gateway::ProcessingGateway;
use mtm_common::events::EventBus;
use pipeline::PipelineController;
use resolution::ResolutionFlow;
use session::SessionStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Event bus capacity; slow SSE clients lag rather than block the pipeline
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PipelineController>,
    pub resolution: Arc<ResolutionFlow>,
    pub gateway: Arc<dyn ProcessingGateway>,
    pub store: SessionStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn ProcessingGateway>, event_bus: EventBus) -> Self {
        let store = SessionStore::new();
        let controller = Arc::new(PipelineController::new(
            gateway.clone(),
            store.clone(),
            event_bus.clone(),
        ));
        let resolution = Arc::new(ResolutionFlow::new(
            gateway.clone(),
            store.clone(),
            event_bus.clone(),
            controller.run_lock(),
        ));

        Self {
            controller,
            resolution,
            gateway,
            store,
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::remote_routes())
        .merge(api::pipeline_routes())
        .merge(api::session_routes())
        .merge(api::resolution_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
