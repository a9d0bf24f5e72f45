//! Pipeline error types

use thiserror::Error;

use crate::store::StoreError;

/// Pipeline errors
///
/// Only `Decode` propagates out of [`Router::dispatch`](crate::Router::dispatch)
/// (it is fatal to the offending agent connection). Storage and diff
/// failures are logged at the stage that produced them and the affected
/// data is dropped.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Envelope payload did not decode; the connection is bad
    #[error(transparent)]
    Decode(#[from] diag_protocol::DecodeError),

    /// A storage bulk call failed; the affected batch is dropped
    #[error("storage operation failed: {0}")]
    Storage(#[from] StoreError),

    /// The diff classified a path into more than one change set
    #[error("snapshot diff produced overlapping change sets")]
    InconsistentDiff,
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
