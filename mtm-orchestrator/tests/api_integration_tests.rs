//! Integration tests for the mtm-orchestrator HTTP API

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use helpers::{album, test_state, wait_for, wait_for_status, Call, MockGateway};
use http_body_util::BodyExt;
use mtm_common::AlbumStatus;
use mtm_orchestrator::session::PipelineStatus;
use mtm_orchestrator::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

fn scenario_gateway() -> MockGateway {
    MockGateway::new()
        .with_scan(vec![
            album("A", 3, AlbumStatus::Pending),
            album("B", 2, AlbumStatus::Pending),
        ])
        .with_identify(vec![
            album("A", 3, AlbumStatus::Match),
            album("B", 2, AlbumStatus::Unclear("Unclear".into())),
        ])
        .with_resolve(album("B", 2, AlbumStatus::Match))
}

fn create_test_app(mock: MockGateway) -> (Router, AppState, Arc<MockGateway>) {
    let (state, mock) = test_state(mock);
    (build_router(state.clone()), state, mock)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn finished_run(app: &Router, state: &AppState) {
    let (status, _) = send(
        app,
        "POST",
        "/pipeline/run",
        Some(json!({ "input_path": "/music/in", "output_path": "/music/out" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_status(&state.store, |s| *s == PipelineStatus::Finished).await;
    // Let the background task release the run lock
    while state.controller.is_busy() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _state, _mock) = create_test_app(MockGateway::new());

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "mtm-orchestrator");
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

#[tokio::test]
async fn test_run_with_empty_location_is_bad_request() {
    let (app, _state, mock) = create_test_app(scenario_gateway());

    let (status, json) = send(
        &app,
        "POST",
        "/pipeline/run",
        Some(json!({ "input_path": "", "output_path": "/music/out" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_run_accepted_then_session_populated() {
    let (app, state, _mock) = create_test_app(scenario_gateway());

    let (status, json) = send(
        &app,
        "POST",
        "/pipeline/run",
        Some(json!({ "input_path": "/music/in", "output_path": "/music/out" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(json["run_id"].is_string());

    wait_for_status(&state.store, |s| *s == PipelineStatus::Finished).await;

    let (status, session) = send(&app, "GET", "/session", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["run_id"], json["run_id"]);
    assert_eq!(session["counters"]["scanned_files"], 5);
    assert_eq!(session["counters"]["identified_matches"], 1);
    assert_eq!(session["organize_progress"], 100);
    assert_eq!(session["organize_failures"], 0);
    assert_eq!(session["status"]["state"], "finished");

    let (status, tagged) = send(&app, "GET", "/session/tagged", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tagged.as_array().map(Vec::len), Some(2));
    assert_eq!(tagged[1]["status"], "Unclear");
}

#[tokio::test]
async fn test_session_reports_organize_failures() {
    let (app, state, _mock) = create_test_app(scenario_gateway().fail_organize_for("A"));
    finished_run(&app, &state).await;

    let (status, session) = send(&app, "GET", "/session", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["organize_failures"], 1);
    assert_eq!(session["organize_outcomes"]["A"]["outcome"], "failed");
    assert_eq!(session["organize_outcomes"]["B"]["outcome"], "skipped");
}

#[tokio::test]
async fn test_second_run_while_busy_is_conflict() {
    let (app, state, _mock) =
        create_test_app(scenario_gateway().with_organize_delay(Duration::from_millis(100)));
    let body = json!({ "input_path": "/music/in", "output_path": "/music/out" });

    let (first, _) = send(&app, "POST", "/pipeline/run", Some(body.clone())).await;
    let (second, json) = send(&app, "POST", "/pipeline/run", Some(body)).await;
    let (reprocess, _) = send(&app, "POST", "/pipeline/reprocess", None).await;

    assert_eq!(first, StatusCode::ACCEPTED);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "CONFLICT");
    assert_eq!(reprocess, StatusCode::CONFLICT);

    wait_for_status(&state.store, |s| *s == PipelineStatus::Finished).await;
}

#[tokio::test]
async fn test_failed_background_run_is_reported_in_health() {
    let (app, state, _mock) = create_test_app(MockGateway::new().fail_scan(404, "Path not found"));

    let (status, _) = send(
        &app,
        "POST",
        "/pipeline/run",
        Some(json!({ "input_path": "/missing", "output_path": "/music/out" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_status(&state.store, |s| matches!(s, PipelineStatus::Error(_))).await;

    // The watcher task records the failure shortly after the run ends
    let mut last_error = None;
    for _ in 0..100 {
        let (_, json) = send(&app, "GET", "/health", None).await;
        if let Some(message) = json["last_error"].as_str() {
            last_error = Some(message.to_string());
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(last_error.as_deref(), Some("Scan failed: Path not found"));
}

#[tokio::test]
async fn test_unknown_session_view_is_not_found() {
    let (app, _state, _mock) = create_test_app(MockGateway::new());

    let (status, json) = send(&app, "GET", "/session/organized", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_album_diff_endpoint() {
    let (app, state, _mock) = create_test_app(scenario_gateway());
    finished_run(&app, &state).await;

    let (status, json) = send(&app, "GET", "/session/albums/A/diff", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["album_id"], "A");
    assert_eq!(json["tracks"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["tracks"][0]["matched"], true);

    let (status, _) = send(&app, "GET", "/session/albums/Z/diff", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resolve_and_reprocess_flow() {
    let (app, state, mock) = create_test_app(scenario_gateway());
    finished_run(&app, &state).await;

    let (status, album) = send(
        &app,
        "POST",
        "/resolution/resolve",
        Some(json!({ "album_id": "B", "release_id": "rel-42" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(album["status"], "Match");

    let (_, session) = send(&app, "GET", "/session", None).await;
    assert_eq!(session["manually_fixed"], json!(["B"]));
    assert_eq!(session["albums_identified"], 1);

    mock.take_calls();
    let (status, accepted) = send(&app, "POST", "/pipeline/reprocess", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let run_id = accepted["run_id"].as_str().unwrap().to_string();
    wait_for(&state.store, |s| {
        s.run_id.map(|id| id.to_string()).as_deref() == Some(run_id.as_str())
            && s.status == PipelineStatus::Finished
    })
    .await;
    assert_eq!(mock.organized_ids(), vec!["B"]);
}

#[tokio::test]
async fn test_resolve_unknown_album_is_not_found() {
    let (app, state, _mock) = create_test_app(scenario_gateway());
    finished_run(&app, &state).await;

    let (status, json) = send(
        &app,
        "POST",
        "/resolution/resolve",
        Some(json!({ "album_id": "Z", "release_id": "rel-42" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_resolution_failure_is_bad_gateway() {
    let (app, state, _mock) = create_test_app(
        MockGateway::new()
            .with_scan(vec![album("B", 1, AlbumStatus::Pending)])
            .with_identify(vec![album("B", 1, AlbumStatus::Unclear("Unclear".into()))])
            .fail_resolve(503, "Metadata service unavailable"),
    );
    finished_run(&app, &state).await;

    let (status, json) = send(
        &app,
        "POST",
        "/resolution/resolve",
        Some(json!({ "album_id": "B", "release_id": "rel-42" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_search_endpoint() {
    let (app, _state, _mock) = create_test_app(
        MockGateway::new().with_search(vec![helpers::candidate("rel-42", "Record", "Band")]),
    );

    let (status, json) = send(
        &app,
        "POST",
        "/resolution/search",
        Some(json!({ "artist": "Band", "album": "Record" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["candidates"][0]["id"], "rel-42");
    assert_eq!(json["candidates"][0]["artist-credit"][0]["name"], "Band");

    let (status, latest) = send(&app, "GET", "/resolution/candidates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["generation"], json["generation"]);

    let (status, _) = send(
        &app,
        "POST",
        "/resolution/search",
        Some(json!({ "artist": "", "album": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remote_status_and_shutdown() {
    let (app, _state, mock) = create_test_app(MockGateway::new().with_health("ok"));

    let (status, json) = send(&app, "GET", "/remote/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service_online"], true);
    assert_eq!(json["metadata_online"], true);

    let (status, json) = send(&app, "POST", "/system/shutdown", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(mock.calls().contains(&Call::Shutdown));
}
