//! Ingest server error types

use std::io;

use thiserror::Error;

/// Agent server errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Failed to bind the listener; fatal at startup
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Listener accept failed during steady state
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Connection I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The agent sent bytes that do not decode; the connection is closed
    #[error(transparent)]
    Decode(#[from] diag_protocol::DecodeError),

    /// The router rejected an envelope payload; the connection is closed
    #[error(transparent)]
    Dispatch(#[from] diag_pipeline::PipelineError),
}

/// Result type for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;
