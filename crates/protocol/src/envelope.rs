//! Agent message envelope
//!
//! Every agent message is a two-field JSON object: a `type` tag and an
//! opaque `payload` decoded per type. The payload is kept as a raw JSON
//! slice so the router can defer (and unit-test) per-type decoding.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{DecodeError, Result};
use crate::models::{FileNode, LogEntry, NetworkPacket};

/// Agent message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Network packet metrics
    Metrics,
    /// Full filesystem inventory snapshot
    LogList,
    /// Tailed log lines
    LogData,
}

impl MessageType {
    /// Stable name, for logging and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::LogList => "log_list",
            Self::LogData => "log_data",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `metrics` payload: a capture window with its packets
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsPayload {
    pub timestamp: DateTime<Utc>,
    pub packets: Vec<NetworkPacket>,
}

/// A decoded agent envelope with its payload still raw
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    payload: Box<RawValue>,
}

impl Envelope {
    /// Decode the payload of a `metrics` envelope
    pub fn metrics(&self) -> Result<MetricsPayload> {
        self.decode_payload("metrics")
    }

    /// Decode the payload of a `log_list` envelope
    pub fn file_list(&self) -> Result<Vec<FileNode>> {
        self.decode_payload("log_list")
    }

    /// Decode the payload of a `log_data` envelope
    pub fn log_entries(&self) -> Result<Vec<LogEntry>> {
        self.decode_payload("log_data")
    }

    fn decode_payload<'de, T: Deserialize<'de>>(&'de self, kind: &'static str) -> Result<T> {
        serde_json::from_str(self.payload.get())
            .map_err(|source| DecodeError::Payload { kind, source })
    }

    /// Raw payload bytes (for diagnostics)
    pub fn payload_len(&self) -> usize {
        self.payload.get().len()
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
