//! Subscriber channel frames
//!
//! Both directions use `{"type": <string>, "payload": <any>}` JSON text
//! frames. Inbound control frames mutate per-session state; outbound
//! event frames mirror the three live event classes.

use serde::{Deserialize, Serialize};

use crate::models::{FileNode, LogEntry, NetworkPacket};

/// Inbound control frame from a subscriber
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Select which log file's entries this session wants streamed.
    /// Empty string disables log delivery.
    ViewFile(String),
    /// Reserved; accepted and ignored.
    SpeedControl(f64),
    /// Unknown control types are silently ignored.
    #[serde(other)]
    Unknown,
}

/// Outbound event frame to a subscriber
///
/// Borrows its payload; frames are serialized at the session write pump
/// so a broadcast batch is never cloned per subscriber.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventFrame<'a> {
    Network(&'a [NetworkPacket]),
    Log(&'a LogEntry),
    FileUpdate(&'a FileNode),
}

#[cfg(test)]
#[path = "frames_test.rs"]
mod tests;
