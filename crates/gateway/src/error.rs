//! Gateway error types

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Server-level errors (bind/serve)
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Failed to bind the listener; fatal at startup
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The HTTP server failed while serving
    #[error("server error: {0}")]
    Serve(#[from] io::Error),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the REST handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request parameters
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Storage query failed
    #[error("query failed: {0}")]
    Storage(#[from] diag_storage::StorageError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "api request failed");
        }
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
