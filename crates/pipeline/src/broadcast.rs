//! Subscriber fan-out
//!
//! The router broadcasts each live event onto every registered session's
//! own bounded queues. Per-session queues (rather than one shared queue
//! per class) keep one slow subscriber from starving the rest; the
//! non-blocking offer keeps any number of slow subscribers from
//! starving ingest.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use diag_protocol::{FileNode, LogEntry, NetworkPacket};

/// Per-session queue capacities, one per event class
#[derive(Debug, Clone, Copy)]
pub struct FanoutCapacities {
    /// Packet queue, in batches
    pub packets: usize,
    pub logs: usize,
    pub files: usize,
}

impl Default for FanoutCapacities {
    fn default() -> Self {
        Self {
            packets: 50_000,
            logs: 10_000,
            files: 2_000,
        }
    }
}

/// Receiving ends of one session's three event queues
#[derive(Debug)]
pub struct SessionQueues {
    pub packets: mpsc::Receiver<Arc<Vec<NetworkPacket>>>,
    pub logs: mpsc::Receiver<LogEntry>,
    pub files: mpsc::Receiver<FileNode>,
}

/// Sending side of a session, held by the broadcaster
#[derive(Debug)]
struct SessionHandle {
    id: u64,
    packets: mpsc::Sender<Arc<Vec<NetworkPacket>>>,
    logs: mpsc::Sender<LogEntry>,
    files: mpsc::Sender<FileNode>,
}

impl SessionHandle {
    fn is_connected(&self) -> bool {
        // All three receivers live and die with the session task
        !self.packets.is_closed()
    }
}

/// Registry of live subscriber sessions
///
/// Broadcast iterates the registry under its read lock but only ever
/// performs non-blocking sends there, so the critical section is
/// bounded regardless of subscriber behavior.
#[derive(Debug, Default)]
pub struct Broadcaster {
    capacities: FanoutCapacities,
    sessions: RwLock<Vec<Arc<SessionHandle>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new(capacities: FanoutCapacities) -> Self {
        Self {
            capacities,
            sessions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new session; returns its id and queue receivers
    pub fn subscribe(&self) -> (u64, SessionQueues) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (packets_tx, packets_rx) = mpsc::channel(self.capacities.packets);
        let (logs_tx, logs_rx) = mpsc::channel(self.capacities.logs);
        let (files_tx, files_rx) = mpsc::channel(self.capacities.files);

        self.sessions.write().push(Arc::new(SessionHandle {
            id,
            packets: packets_tx,
            logs: logs_tx,
            files: files_tx,
        }));

        tracing::debug!(session_id = id, "subscriber session registered");

        (
            id,
            SessionQueues {
                packets: packets_rx,
                logs: logs_rx,
                files: files_rx,
            },
        )
    }

    /// Remove a session; safe to call more than once
    pub fn unsubscribe(&self, id: u64) {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() < before {
            tracing::debug!(session_id = id, "subscriber session removed");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Offer a packet batch to every session; returns refused offers
    pub fn broadcast_packets(&self, batch: &Arc<Vec<NetworkPacket>>) -> usize {
        let sessions = self.sessions.read();
        let mut dropped = 0;
        for session in sessions.iter() {
            if session.packets.try_send(Arc::clone(batch)).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Offer a log entry to every session; returns refused offers
    ///
    /// Per-session file filtering happens at the session's write pump,
    /// not here; the broadcaster has no notion of `viewed_file`.
    pub fn broadcast_log(&self, entry: &LogEntry) -> usize {
        let sessions = self.sessions.read();
        let mut dropped = 0;
        for session in sessions.iter() {
            if session.logs.try_send(entry.clone()).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Offer a file record to every session; returns refused offers
    pub fn broadcast_file(&self, record: &FileNode) -> usize {
        let sessions = self.sessions.read();
        let mut dropped = 0;
        for session in sessions.iter() {
            if session.files.try_send(record.clone()).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    /// Drop handles whose session task is gone without unsubscribing
    pub fn reap_disconnected(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|s| s.is_connected());
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "reaped disconnected subscriber sessions");
        }
        removed
    }

    /// Drop every session handle; pending events are discarded
    ///
    /// Shutdown only. Closing the senders ends each session's queue
    /// receivers, which unblocks its write pump.
    pub fn close_all(&self) {
        self.sessions.write().clear();
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod tests;
