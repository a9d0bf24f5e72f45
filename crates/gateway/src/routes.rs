//! REST routes
//!
//! Thin wrappers over the history store. Responses always serialize
//! collections as JSON arrays; an empty result is `[]`, never `null`.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use diag_protocol::{FileNode, LogEntry, ROOT_PARENT};
use diag_storage::NetworkMetrics;

use crate::error::ApiError;
use crate::session::ws_handler;
use crate::state::AppState;

/// Default page size for `/api/logs`
const DEFAULT_LOG_LIMIT: i64 = 100;

/// Default tree depth for `/api/files`
const DEFAULT_TREE_DEPTH: i32 = 1;

/// Deepest tree the API will serve in one request
const MAX_TREE_DEPTH: i32 = 10;

/// Build the gateway router: WebSocket endpoint plus the history API
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/files", get(get_files))
        .route("/api/logs", get(get_logs))
        .route("/api/logs/search", get(search_logs))
        .route("/api/network/metrics", get(get_network_metrics))
        .with_state(state)
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
struct FilesParams {
    path: Option<String>,
    depth: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct LogsParams {
    file: String,
    before: Option<DateTime<Utc>>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: String,
    /// Comma-separated file paths; absent means all files
    files: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct NetworkParams {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    /// Comma-separated protocol names; absent means all protocols
    protocols: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/files?path=/var/log&depth=2
async fn get_files(
    State(state): State<AppState>,
    Query(params): Query<FilesParams>,
) -> Result<Json<Vec<FileNode>>, ApiError> {
    let path = normalize_path(params.path.as_deref().unwrap_or(ROOT_PARENT));
    let depth = params
        .depth
        .unwrap_or(DEFAULT_TREE_DEPTH)
        .clamp(1, MAX_TREE_DEPTH);

    let files = state.history.file_tree(&path, depth).await?;
    Ok(Json(files))
}

/// GET /api/logs?file=/var/log/app.log&before=...&limit=200
async fn get_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsParams>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    if params.file.is_empty() {
        return Err(ApiError::BadRequest("file is required".into()));
    }
    let before = params.before.unwrap_or_else(Utc::now);
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    let logs = state.history.logs_page(&params.file, before, limit).await?;
    Ok(Json(logs))
}

/// GET /api/logs/search?q=error&files=/a.log,/b.log&start=...&end=...
async fn search_logs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    if params.q.is_empty() {
        return Err(ApiError::BadRequest("q is required".into()));
    }
    let end = params.end.unwrap_or_else(Utc::now);
    let start = params.start.unwrap_or(end - Duration::hours(24));
    let files = csv_list(params.files.as_deref());

    let logs = state
        .history
        .search_logs(&params.q, files.as_deref(), start, end)
        .await?;
    Ok(Json(logs))
}

/// GET /api/network/metrics?start=...&end=...&protocols=TCP,UDP
async fn get_network_metrics(
    State(state): State<AppState>,
    Query(params): Query<NetworkParams>,
) -> Result<Json<NetworkMetrics>, ApiError> {
    let end = params.end.unwrap_or_else(Utc::now);
    let start = params.start.unwrap_or(end - Duration::minutes(15));
    let protocols = csv_list(params.protocols.as_deref());

    let metrics = state
        .history
        .network_metrics(start, end, protocols.as_deref())
        .await?;
    Ok(Json(metrics))
}

// =============================================================================
// Helpers
// =============================================================================

/// Force a leading slash and strip a trailing one (except for the root)
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return ROOT_PARENT.to_string();
    }
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Split a comma-separated parameter, dropping empty segments
fn csv_list(raw: Option<&str>) -> Option<Vec<String>> {
    let raw = raw?;
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
