//! History API tests
//!
//! Exercise the REST surface against a canned history backend using
//! in-process requests.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use diag_gateway::build_router;

use common::{StubHistory, log_entry, test_state};

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_files_normalizes_path_and_clamps_depth() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app, "/api/files?path=var/log/&depth=99").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_array());
    assert_eq!(ctx.history.calls.lock()[0], "tree:/var/log:10");
}

#[tokio::test]
async fn test_files_defaults_to_root() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, _) = get(app, "/api/files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.history.calls.lock()[0], "tree:/:1");
}

#[tokio::test]
async fn test_logs_requires_file() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app.clone(), "/api/logs?file=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("file"));

    // Missing entirely is a query rejection, still a 400
    let (status, _) = get(app, "/api/logs").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logs_returns_entries() {
    let stub = StubHistory {
        logs: vec![log_entry("/a.log", "hello")],
        ..StubHistory::default()
    };
    let ctx = test_state(stub);
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app, "/api/logs?file=/a.log&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["line"], "hello");
    assert_eq!(ctx.history.calls.lock()[0], "logs:/a.log:5");
}

#[tokio::test]
async fn test_search_passes_file_filter() {
    let stub = StubHistory {
        logs: vec![
            log_entry("/a.log", "connection error"),
            log_entry("/a.log", "all quiet"),
        ],
        ..StubHistory::default()
    };
    let ctx = test_state(stub);
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app, "/api/logs/search?q=error&files=/a.log,/b.log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["line"], "connection error");
    assert_eq!(ctx.history.calls.lock()[0], "search:error:/a.log+/b.log");
}

#[tokio::test]
async fn test_search_requires_query() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, _) = get(app, "/api/logs/search?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_network_metrics_with_protocol_filter() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app, "/api/network/metrics?protocols=TCP,UDP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["packet_count"], 2);
    assert_eq!(body["packets"].as_array().unwrap().len(), 2);
    assert_eq!(ctx.history.calls.lock()[0], "metrics:TCP+UDP");
}

#[tokio::test]
async fn test_empty_results_are_arrays() {
    let ctx = test_state(StubHistory::default());
    let app = build_router(ctx.state.clone());

    let (status, body) = get(app, "/api/logs?file=/none.log").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}
