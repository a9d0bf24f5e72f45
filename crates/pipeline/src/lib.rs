//! Diagnostic telemetry - ingest pipeline
//!
//! The router that sits between agent connections and everything else.
//!
//! # Architecture
//!
//! ```text
//! [Agent connections]          [Router]                      [Consumers]
//!    conn 1 ──┐                                           ┌──→ storage (bulk writes)
//!    conn 2 ──┼──→ dispatch ──→ metrics  → PacketBatcher ─┤
//!    conn N ──┘                 log_list → FileMirror diff│
//!                               log_data → bulk insert    └──→ Broadcaster
//!                                                               ├──→ session 1 queues
//!                                                               └──→ session N queues
//! ```
//!
//! # Key design
//!
//! - **Single writer**: the router is the only writer of storage on the
//!   ingest path and the only mutator of the file mirror.
//! - **Arc fan-out**: packet batches are wrapped in `Arc` once and shared
//!   across all subscriber queues.
//! - **Lossy fan-out**: every broadcast uses `try_send`; a slow subscriber
//!   costs events, never ingest throughput.
//! - **Lossless decode, lossy persist**: payload decode errors are fatal
//!   to the offending connection, storage failures drop the affected
//!   batch and nothing else.

mod batcher;
mod broadcast;
mod error;
mod metrics;
mod mirror;
mod router;
mod store;

pub use batcher::PacketBatcher;
pub use broadcast::{Broadcaster, FanoutCapacities, SessionQueues};
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, RouterMetrics, RouterMetricsHandle};
pub use mirror::{ChangeSet, FileMirror};
pub use router::Router;
pub use store::{Store, StoreError, StoreResult};

/// Default packet batch size (packets per storage call)
pub const DEFAULT_BATCH_SIZE: usize = 1_000;

/// Default cadence of the time-triggered packet flush
pub const DEFAULT_FLUSH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
