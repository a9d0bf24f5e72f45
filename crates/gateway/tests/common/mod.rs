//! Shared test fixtures for gateway integration tests

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use diag_gateway::AppState;
use diag_pipeline::{Broadcaster, FanoutCapacities};
use diag_protocol::{FileNode, LogEntry, NetworkPacket};
use diag_storage::{HistoryStore, NetworkMetrics, Result};

pub fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn log_entry(filename: &str, line: &str) -> LogEntry {
    LogEntry {
        filename: filename.into(),
        line: line.into(),
        line_num: 1,
        timestamp: ts(),
        level: "info".into(),
    }
}

pub fn file_node(path: &str) -> FileNode {
    FileNode {
        path: path.into(),
        parent_path: "/".into(),
        name: path.trim_start_matches('/').into(),
        is_directory: false,
        size: 16,
        mod_time: ts(),
        is_gzipped: false,
        is_scraped: false,
    }
}

pub fn packet() -> NetworkPacket {
    NetworkPacket {
        timestamp: ts(),
        protocol: "TCP".into(),
        src_ip: "10.0.0.1".into(),
        dst_ip: "10.0.0.2".into(),
        src_port: 443,
        dst_port: 55_000,
        length: 60,
        payload_size: 0,
        tcp_flags: "ACK".into(),
    }
}

/// Canned history backend that records how it was called
#[derive(Default)]
pub struct StubHistory {
    pub calls: Mutex<Vec<String>>,
    pub logs: Vec<LogEntry>,
}

#[async_trait]
impl HistoryStore for StubHistory {
    async fn file_tree(&self, path: &str, depth: i32) -> Result<Vec<FileNode>> {
        self.calls.lock().push(format!("tree:{path}:{depth}"));
        Ok(vec![file_node("/var/log/app.log")])
    }

    async fn logs_page(
        &self,
        file_path: &str,
        _before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LogEntry>> {
        self.calls.lock().push(format!("logs:{file_path}:{limit}"));
        Ok(self.logs.clone())
    }

    async fn search_logs(
        &self,
        query: &str,
        files: Option<&[String]>,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        let files = files.map(|f| f.join("+")).unwrap_or_else(|| "*".into());
        self.calls.lock().push(format!("search:{query}:{files}"));
        Ok(self
            .logs
            .iter()
            .filter(|entry| entry.line.contains(query))
            .cloned()
            .collect())
    }

    async fn network_metrics(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        protocols: Option<&[String]>,
    ) -> Result<NetworkMetrics> {
        let protocols = protocols.map(|p| p.join("+")).unwrap_or_else(|| "*".into());
        self.calls.lock().push(format!("metrics:{protocols}"));
        Ok(NetworkMetrics {
            packet_count: 2,
            total_bytes: 120,
            avg_packet_size: 60.0,
            packets: vec![packet(), packet()],
            ..NetworkMetrics::default()
        })
    }
}

pub struct TestState {
    pub history: Arc<StubHistory>,
    pub broadcaster: Arc<Broadcaster>,
    pub cancel: CancellationToken,
    pub state: AppState,
}

pub fn test_state(history: StubHistory) -> TestState {
    let history = Arc::new(history);
    let broadcaster = Arc::new(Broadcaster::new(FanoutCapacities::default()));
    let cancel = CancellationToken::new();
    let state = AppState::new(
        Arc::clone(&history) as Arc<dyn HistoryStore>,
        Arc::clone(&broadcaster),
        cancel.clone(),
    );
    TestState {
        history,
        broadcaster,
        cancel,
        state,
    }
}
