//! Diagnostic telemetry - storage adapter
//!
//! Postgres persistence for the three record kinds. The ingest path
//! only ever issues single-round-trip bulk statements; the history
//! path serves the gateway's query API.
//!
//! # Relations
//!
//! - `files` — current filesystem inventory, `path` primary key
//! - `logs` — append-only tailed lines with an English full-text index
//! - `network_packets` — append-only packet summaries, time-indexed
//!
//! Schema is created on startup when absent; there is no migration
//! machinery beyond `CREATE ... IF NOT EXISTS`.

mod error;
mod files;
mod history;
mod logs;
mod packets;
mod store;

pub use error::{Result, StorageError};
pub use history::HistoryStore;
pub use packets::NetworkMetrics;
pub use store::PgStore;
