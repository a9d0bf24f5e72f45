//! Storage error types

use thiserror::Error;

/// Storage adapter errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Pool construction or the startup ping failed
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Schema bootstrap failed
    #[error("schema initialization failed: {0}")]
    Schema(#[source] sqlx::Error),

    /// A query or bulk statement failed
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
