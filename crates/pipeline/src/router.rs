//! Message router
//!
//! Classifies each decoded agent envelope and drives the three
//! type-specific pipelines: packet batching, snapshot diffing, and the
//! log relay. One router instance is shared by every agent connection.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use diag_protocol::{Envelope, FileNode, LogEntry, MessageType, MetricsPayload, NetworkPacket};

use crate::DEFAULT_FLUSH_INTERVAL;
use crate::batcher::PacketBatcher;
use crate::broadcast::Broadcaster;
use crate::error::{PipelineError, Result};
use crate::metrics::{RouterMetrics, RouterMetricsHandle};
use crate::mirror::FileMirror;
use crate::store::Store;

/// Ingest message router
///
/// `dispatch` is called from every connection reader; all interior
/// state is either lock-free or behind short mutex/rwlock sections, so
/// connections only serialize on the shared packet buffer append.
pub struct Router {
    store: Arc<dyn Store>,
    mirror: Arc<FileMirror>,
    broadcaster: Arc<Broadcaster>,
    batcher: PacketBatcher,
    metrics: Arc<RouterMetrics>,
    flush_interval: Duration,
}

impl Router {
    pub fn new(
        store: Arc<dyn Store>,
        mirror: Arc<FileMirror>,
        broadcaster: Arc<Broadcaster>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            mirror,
            broadcaster,
            batcher: PacketBatcher::new(batch_size),
            metrics: Arc::new(RouterMetrics::new()),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Override the time-trigger cadence (tests use a short interval)
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> RouterMetricsHandle {
        RouterMetricsHandle::new(Arc::clone(&self.metrics))
    }

    /// Packets currently buffered and unflushed
    pub fn buffered_packets(&self) -> usize {
        self.batcher.len()
    }

    /// Route one decoded envelope
    ///
    /// Returns an error only when the payload fails to decode, which the
    /// caller must treat as fatal to that agent connection. Storage and
    /// diff failures are absorbed here per the drop-don't-retry policy.
    pub async fn dispatch(&self, envelope: &Envelope) -> Result<()> {
        self.metrics.record_envelope();

        match envelope.kind {
            MessageType::Metrics => {
                let payload = envelope.metrics()?;
                self.handle_metrics(payload).await;
            }
            MessageType::LogList => {
                let files = envelope.file_list()?;
                tracing::debug!(count = files.len(), "received file snapshot");
                if let Err(e) = self.apply_snapshot(files).await {
                    self.metrics.record_snapshot_dropped();
                    tracing::warn!(error = %e, "snapshot dropped, mirror unchanged");
                }
            }
            MessageType::LogData => {
                let entries = envelope.log_entries()?;
                self.handle_logs(entries).await;
            }
        }

        Ok(())
    }

    /// Packet pipeline: buffer, flush inline when the size trigger fires
    async fn handle_metrics(&self, payload: MetricsPayload) {
        self.metrics.record_packets(payload.packets.len() as u64);

        for batch in self.batcher.append(payload.packets) {
            self.flush_packets(batch).await;
        }
    }

    /// Persist one packet batch and fan it out
    ///
    /// A storage failure loses the batch: packet data is volatile and
    /// the agent keeps producing, so there is no retry and no re-queue.
    async fn flush_packets(&self, batch: Vec<NetworkPacket>) {
        let count = batch.len();
        if let Err(e) = self.store.insert_packets(&batch).await {
            self.metrics.record_storage_failure();
            tracing::warn!(error = %e, count, "packet batch lost: storage insert failed");
            return;
        }
        self.metrics.record_batch_flushed();
        tracing::trace!(count, "packet batch flushed");

        let batch = Arc::new(batch);
        let dropped = self.broadcaster.broadcast_packets(&batch);
        self.metrics.record_fanout_drops(dropped as u64);
    }

    /// File pipeline: diff the snapshot, mutate storage, then the mirror
    ///
    /// Storage order is delete → insert → update so a rename never
    /// trips a uniqueness constraint and a concurrent reader never sees
    /// a stale record shadowing a fresher one. The mirror is written
    /// only after storage accepted every step; on failure the next
    /// snapshot re-derives the same changes.
    async fn apply_snapshot(&self, snapshot: Vec<FileNode>) -> Result<()> {
        let changes = self.mirror.diff(snapshot);

        if changes.is_empty() {
            self.metrics.record_snapshot_unchanged();
            return Ok(());
        }
        if !changes.is_consistent() {
            return Err(PipelineError::InconsistentDiff);
        }

        if !changes.deleted.is_empty() {
            self.store.delete_files(&changes.deleted).await?;
        }
        if !changes.added.is_empty() {
            self.store.upsert_files(&changes.added).await?;
        }
        if !changes.updated.is_empty() {
            self.store.upsert_files(&changes.updated).await?;
        }

        self.mirror.apply(&changes);
        self.metrics.record_snapshot_applied();
        tracing::debug!(
            added = changes.added.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "snapshot applied"
        );

        let mut dropped = 0;
        for record in changes.added.iter().chain(changes.updated.iter()) {
            dropped += self.broadcaster.broadcast_file(record);
        }
        self.metrics.record_fanout_drops(dropped as u64);

        Ok(())
    }

    /// Log relay: one bulk insert per envelope, then per-entry fan-out
    async fn handle_logs(&self, entries: Vec<LogEntry>) {
        if entries.is_empty() {
            return;
        }

        if let Err(e) = self.store.insert_logs(&entries).await {
            self.metrics.record_storage_failure();
            tracing::warn!(
                error = %e,
                count = entries.len(),
                "log entries lost: storage insert failed"
            );
            return;
        }
        self.metrics.record_logs_persisted(entries.len() as u64);

        let mut dropped = 0;
        for entry in &entries {
            dropped += self.broadcaster.broadcast_log(entry);
        }
        self.metrics.record_fanout_drops(dropped as u64);
    }

    /// Time-triggered packet flush loop
    ///
    /// Flushes any non-empty buffer on each tick and performs one final
    /// flush on cancellation. Also reaps subscriber sessions whose task
    /// died without unsubscribing.
    pub async fn run_flush_timer(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(batch) = self.batcher.drain() {
                        self.flush_packets(batch).await;
                    }
                    self.broadcaster.reap_disconnected();
                }
            }
        }

        self.flush_remaining().await;

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            envelopes = snapshot.envelopes_received,
            packets = snapshot.packets_received,
            batches = snapshot.packet_batches_flushed,
            storage_failures = snapshot.storage_failures,
            fanout_drops = snapshot.fanout_drops,
            "packet flush timer stopped"
        );
    }

    /// Flush whatever is still buffered; used on shutdown
    pub async fn flush_remaining(&self) {
        if let Some(batch) = self.batcher.drain() {
            self.flush_packets(batch).await;
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("buffered_packets", &self.batcher.len())
            .field("mirror_len", &self.mirror.len())
            .field("sessions", &self.broadcaster.session_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
