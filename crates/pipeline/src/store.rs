//! Storage backend contract
//!
//! The ingest path needs exactly five bulk primitives from storage. The
//! trait keeps the pipeline testable without a live database; the
//! Postgres adapter lives in `diag-storage`.

use async_trait::async_trait;

use diag_protocol::{FileNode, LogEntry, NetworkPacket};

/// Opaque backend error; the pipeline only ever logs it
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for storage operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Bulk storage primitives used by the ingest path
///
/// All operations are single round-trips. `upsert_files` must be
/// idempotent on `path`; `insert_logs` and `insert_packets` are
/// append-only. Implementations are cancelled by dropping the future.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every file record; used once at startup to seed the mirror
    async fn load_files(&self) -> StoreResult<Vec<FileNode>>;

    /// Insert-or-replace file records keyed by `path`
    async fn upsert_files(&self, files: &[FileNode]) -> StoreResult<()>;

    /// Delete file records by `path`
    async fn delete_files(&self, paths: &[String]) -> StoreResult<()>;

    /// Append log entries
    async fn insert_logs(&self, entries: &[LogEntry]) -> StoreResult<()>;

    /// Append network packets
    async fn insert_packets(&self, packets: &[NetworkPacket]) -> StoreResult<()>;
}
