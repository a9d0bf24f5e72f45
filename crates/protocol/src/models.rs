//! Core data model
//!
//! The three record kinds carried by the agent stream. Field names match
//! the JSON the agents emit; timestamps are RFC 3339 on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel parent path for entries at the filesystem root
pub const ROOT_PARENT: &str = "/";

fn root_parent() -> String {
    ROOT_PARENT.to_string()
}

/// A single entry of a filesystem inventory snapshot
///
/// Identity is `path`. Change detection compares the four material
/// fields only (see [`FileNode::differs_materially`]); `is_scraped` is
/// bookkeeping and never triggers an update on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    #[serde(default = "root_parent")]
    pub parent_path: String,
    pub name: String,
    pub is_directory: bool,
    pub size: i64,
    pub mod_time: DateTime<Utc>,
    #[serde(default)]
    pub is_gzipped: bool,
    #[serde(default)]
    pub is_scraped: bool,
}

impl FileNode {
    /// Whether `other` differs from `self` in a way that must be persisted
    ///
    /// Compares `mod_time`, `size`, `is_directory` and `is_gzipped`.
    pub fn differs_materially(&self, other: &FileNode) -> bool {
        self.mod_time != other.mod_time
            || self.size != other.size
            || self.is_directory != other.is_directory
            || self.is_gzipped != other.is_gzipped
    }
}

/// One tailed log line
///
/// No model-level identity; storage assigns a surrogate id on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Path of the source file the line was tailed from
    pub filename: String,
    /// The line, verbatim
    pub line: String,
    pub line_num: i32,
    pub timestamp: DateTime<Utc>,
    /// Free-form severity; agents typically send `error`/`warning`/`info`
    pub level: String,
}

/// A captured network packet summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPacket {
    pub timestamp: DateTime<Utc>,
    pub protocol: String,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: i32,
    pub dst_port: i32,
    pub length: i32,
    pub payload_size: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tcp_flags: String,
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
