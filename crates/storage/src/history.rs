//! History query surface
//!
//! The gateway's REST handlers talk to storage through this trait so
//! they stay testable without Postgres. `PgStore` is the only
//! production implementation; it also backs the pipeline's `Store`
//! trait for the ingest path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use diag_pipeline::{Store, StoreResult};
use diag_protocol::{FileNode, LogEntry, NetworkPacket};

use crate::error::Result;
use crate::packets::NetworkMetrics;
use crate::store::PgStore;

/// Read-only queries over stored telemetry
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Subtree of the file inventory rooted at `path`
    async fn file_tree(&self, path: &str, depth: i32) -> Result<Vec<FileNode>>;

    /// Page backwards through one file's log entries
    async fn logs_page(
        &self,
        file_path: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LogEntry>>;

    /// Full-text search over log lines
    async fn search_logs(
        &self,
        query: &str,
        files: Option<&[String]>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>>;

    /// Range aggregates plus the newest packets
    async fn network_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        protocols: Option<&[String]>,
    ) -> Result<NetworkMetrics>;
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn file_tree(&self, path: &str, depth: i32) -> Result<Vec<FileNode>> {
        PgStore::file_tree(self, path, depth).await
    }

    async fn logs_page(
        &self,
        file_path: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LogEntry>> {
        PgStore::logs_page(self, file_path, before, limit).await
    }

    async fn search_logs(
        &self,
        query: &str,
        files: Option<&[String]>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        PgStore::search_logs(self, query, files, start, end).await
    }

    async fn network_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        protocols: Option<&[String]>,
    ) -> Result<NetworkMetrics> {
        PgStore::network_metrics(self, start, end, protocols).await
    }
}

/// Ingest-path bulk primitives; the router only sees this trait
#[async_trait]
impl Store for PgStore {
    async fn load_files(&self) -> StoreResult<Vec<FileNode>> {
        Ok(PgStore::load_files(self).await?)
    }

    async fn upsert_files(&self, files: &[FileNode]) -> StoreResult<()> {
        Ok(PgStore::upsert_files(self, files).await?)
    }

    async fn delete_files(&self, paths: &[String]) -> StoreResult<()> {
        Ok(PgStore::delete_files(self, paths).await?)
    }

    async fn insert_logs(&self, entries: &[LogEntry]) -> StoreResult<()> {
        Ok(PgStore::insert_logs(self, entries).await?)
    }

    async fn insert_packets(&self, packets: &[NetworkPacket]) -> StoreResult<()> {
        Ok(PgStore::insert_packets(self, packets).await?)
    }
}
