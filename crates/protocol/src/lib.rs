//! Diagnostic telemetry - wire protocol
//!
//! Shared wire types for the agent channel and the subscriber channel.
//!
//! # Agent protocol
//!
//! Agents push a stream of self-delimiting JSON envelopes over TCP:
//!
//! ```text
//! { "type": "metrics",  "payload": { "timestamp": ..., "packets": [...] } }
//! { "type": "log_list", "payload": [ <FileNode>, ... ] }
//! { "type": "log_data", "payload": [ <LogEntry>, ... ] }
//! ```
//!
//! There is no framing beyond JSON self-delimitation; [`EnvelopeDecoder`]
//! performs incremental decoding over a growable byte buffer so envelopes
//! can be split across arbitrary read boundaries.
//!
//! # Subscriber protocol
//!
//! Subscribers exchange JSON text frames of the same `{type, payload}`
//! shape: [`ClientFrame`] inbound, [`EventFrame`] outbound.

mod decode;
mod envelope;
mod error;
mod frames;
mod models;

pub use decode::EnvelopeDecoder;
pub use envelope::{Envelope, MessageType, MetricsPayload};
pub use error::{DecodeError, Result};
pub use frames::{ClientFrame, EventFrame};
pub use models::{FileNode, LogEntry, NetworkPacket, ROOT_PARENT};

/// Default cap on a single agent envelope (16 MiB)
///
/// File snapshots can be large; anything beyond this is treated as a
/// malformed stream.
pub const DEFAULT_MAX_ENVELOPE_SIZE: usize = 16 * 1024 * 1024;
