//! Router metrics
//!
//! Lock-free counters on the ingest hot path. `Relaxed` ordering is
//! sufficient; counters are monotonic and only read for reporting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the ingest router
#[derive(Debug, Default)]
pub struct RouterMetrics {
    envelopes_received: AtomicU64,
    packets_received: AtomicU64,
    packet_batches_flushed: AtomicU64,
    logs_persisted: AtomicU64,
    snapshots_applied: AtomicU64,
    snapshots_unchanged: AtomicU64,
    snapshots_dropped: AtomicU64,
    storage_failures: AtomicU64,
    fanout_drops: AtomicU64,
}

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_envelope(&self) {
        self.envelopes_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_packets(&self, count: u64) {
        self.packets_received.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_batch_flushed(&self) {
        self.packet_batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_logs_persisted(&self, count: u64) {
        self.logs_persisted.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_snapshot_applied(&self) {
        self.snapshots_applied.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_snapshot_unchanged(&self) {
        self.snapshots_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_snapshot_dropped(&self) {
        self.snapshots_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_storage_failure(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record refused fan-out offers (queue overflow drops)
    #[inline]
    pub fn record_fanout_drops(&self, count: u64) {
        if count > 0 {
            self.fanout_drops.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            envelopes_received: self.envelopes_received.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packet_batches_flushed: self.packet_batches_flushed.load(Ordering::Relaxed),
            logs_persisted: self.logs_persisted.load(Ordering::Relaxed),
            snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
            snapshots_unchanged: self.snapshots_unchanged.load(Ordering::Relaxed),
            snapshots_dropped: self.snapshots_dropped.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            fanout_drops: self.fanout_drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the router counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub envelopes_received: u64,
    pub packets_received: u64,
    pub packet_batches_flushed: u64,
    pub logs_persisted: u64,
    pub snapshots_applied: u64,
    pub snapshots_unchanged: u64,
    pub snapshots_dropped: u64,
    pub storage_failures: u64,
    pub fanout_drops: u64,
}

/// Cloneable handle for reading router metrics externally
///
/// Remains valid for the life of the process, independent of the router.
#[derive(Debug, Clone)]
pub struct RouterMetricsHandle {
    metrics: Arc<RouterMetrics>,
}

impl RouterMetricsHandle {
    pub(crate) fn new(metrics: Arc<RouterMetrics>) -> Self {
        Self { metrics }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
