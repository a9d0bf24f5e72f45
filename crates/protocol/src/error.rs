//! Protocol error types

use thiserror::Error;

/// Errors produced while decoding the agent stream
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Stream contained bytes that are not valid JSON
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A payload did not match the shape its envelope type requires
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A single envelope exceeded the configured size cap
    #[error("envelope exceeds {limit} bytes")]
    Oversized { limit: usize },
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, DecodeError>;
