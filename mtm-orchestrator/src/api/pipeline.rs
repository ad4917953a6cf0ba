//! Pipeline API handlers
//!
//! POST /pipeline/run, POST /pipeline/reprocess

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiResult, pipeline::StartedRun, AppState};

/// POST /pipeline/run request
#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub input_path: String,
    #[serde(default)]
    pub output_path: String,
}

/// Response for an accepted run or reprocess
#[derive(Debug, Serialize)]
pub struct RunAcceptedResponse {
    pub run_id: Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// POST /pipeline/run
///
/// Returns 202 Accepted with the run id; the run continues in the background.
pub async fn start_run(
    State(state): State<AppState>,
    Json(request): Json<StartRunRequest>,
) -> ApiResult<(StatusCode, Json<RunAcceptedResponse>)> {
    let started = state
        .controller
        .start_run(request.input_path.clone(), request.output_path.clone())?;

    tracing::info!(
        run_id = %started.run_id,
        input_path = %request.input_path,
        output_path = %request.output_path,
        "Pipeline run accepted"
    );

    Ok(accepted(state, started))
}

/// POST /pipeline/reprocess
pub async fn start_reprocess(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RunAcceptedResponse>)> {
    let started = state.controller.start_reprocess()?;
    tracing::info!(run_id = %started.run_id, "Reprocess accepted");
    Ok(accepted(state, started))
}

/// Watch the background task so its failure shows up in /health
fn accepted(state: AppState, started: StartedRun) -> (StatusCode, Json<RunAcceptedResponse>) {
    let StartedRun { run_id, handle } = started;

    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(summary)) => {
                tracing::info!(
                    run_id = %run_id,
                    moved = summary.moved,
                    failed = summary.failed,
                    "Background run completed"
                );
            }
            Ok(Err(e)) => {
                tracing::error!(run_id = %run_id, error = %e, "Background run failed");
                state.record_error(e.to_string()).await;
            }
            Err(join_error) => {
                tracing::error!(run_id = %run_id, error = %join_error, "Background run task aborted");
                state.record_error(format!("Run task aborted: {}", join_error)).await;
            }
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(RunAcceptedResponse {
            run_id,
            started_at: chrono::Utc::now(),
        }),
    )
}

/// Build pipeline routes
pub fn pipeline_routes() -> Router<AppState> {
    Router::new()
        .route("/pipeline/run", post(start_run))
        .route("/pipeline/reprocess", post(start_reprocess))
}
