//! End-to-end tests for the agent server
//!
//! Drive a real TCP listener with raw JSON streams and observe effects
//! through an in-process storage recorder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use diag_ingest::{AgentServer, AgentServerConfig};
use diag_pipeline::{Broadcaster, FanoutCapacities, FileMirror, Router, Store, StoreResult};
use diag_protocol::{FileNode, LogEntry, NetworkPacket};

#[derive(Default)]
struct RecordingStore {
    logs: Mutex<Vec<LogEntry>>,
    packets: Mutex<Vec<NetworkPacket>>,
    files: Mutex<Vec<FileNode>>,
}

#[async_trait]
impl Store for RecordingStore {
    async fn load_files(&self) -> StoreResult<Vec<FileNode>> {
        Ok(Vec::new())
    }

    async fn upsert_files(&self, files: &[FileNode]) -> StoreResult<()> {
        self.files.lock().extend_from_slice(files);
        Ok(())
    }

    async fn delete_files(&self, _paths: &[String]) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_logs(&self, entries: &[LogEntry]) -> StoreResult<()> {
        self.logs.lock().extend_from_slice(entries);
        Ok(())
    }

    async fn insert_packets(&self, packets: &[NetworkPacket]) -> StoreResult<()> {
        self.packets.lock().extend_from_slice(packets);
        Ok(())
    }
}

struct Harness {
    store: Arc<RecordingStore>,
    server: Arc<AgentServer>,
    cancel: CancellationToken,
    run: tokio::task::JoinHandle<diag_ingest::Result<()>>,
}

async fn start_server() -> Harness {
    let store = Arc::new(RecordingStore::default());
    let mirror = Arc::new(FileMirror::new());
    let broadcaster = Arc::new(Broadcaster::new(FanoutCapacities::default()));
    let router = Arc::new(Router::new(
        Arc::clone(&store) as Arc<dyn Store>,
        mirror,
        broadcaster,
        1_000,
    ));

    let config = AgentServerConfig {
        drain_timeout: Duration::from_secs(5),
        ..AgentServerConfig::with_addr("127.0.0.1:0")
    };
    let server = Arc::new(AgentServer::bind(config, router).await.expect("bind"));
    let cancel = CancellationToken::new();

    let run = {
        let server = Arc::clone(&server);
        let cancel = cancel.clone();
        tokio::spawn(async move { server.run(cancel).await })
    };

    Harness {
        store,
        server,
        cancel,
        run,
    }
}

impl Harness {
    async fn connect(&self) -> TcpStream {
        let addr = self.server.local_addr().expect("local addr");
        TcpStream::connect(addr).await.expect("connect")
    }

    /// Poll until `check` passes or a deadline elapses
    async fn wait_until(&self, check: impl Fn() -> bool) {
        let waited = timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached in time");
    }
}

const LOG_ENVELOPE: &str = r#"{"type":"log_data","payload":[
    {"filename":"/var/log/app.log","line":"started","line_num":1,
     "timestamp":"2024-06-01T12:00:00Z","level":"info"},
    {"filename":"/var/log/app.log","line":"ready","line_num":2,
     "timestamp":"2024-06-01T12:00:01Z","level":"info"}
]}"#;

const SNAPSHOT_ENVELOPE: &str = r#"{"type":"log_list","payload":[
    {"path":"/var/log/app.log","parent_path":"/var/log","name":"app.log",
     "is_directory":false,"size":64,"mod_time":"2024-06-01T12:00:00Z"}
]}"#;

#[tokio::test]
async fn test_log_data_reaches_storage() {
    let harness = start_server().await;

    let mut conn = harness.connect().await;
    conn.write_all(LOG_ENVELOPE.as_bytes()).await.unwrap();

    harness.wait_until(|| harness.store.logs.lock().len() == 2).await;
    let logs = harness.store.logs.lock();
    assert_eq!(logs[0].line, "started");
    assert_eq!(logs[1].line_num, 2);
}

#[tokio::test]
async fn test_snapshot_reaches_storage() {
    let harness = start_server().await;

    let mut conn = harness.connect().await;
    conn.write_all(SNAPSHOT_ENVELOPE.as_bytes()).await.unwrap();

    harness
        .wait_until(|| harness.store.files.lock().len() == 1)
        .await;
    assert_eq!(harness.store.files.lock()[0].path, "/var/log/app.log");
}

#[tokio::test]
async fn test_envelope_split_across_writes() {
    let harness = start_server().await;

    let bytes = LOG_ENVELOPE.as_bytes();
    let mut conn = harness.connect().await;
    conn.write_all(&bytes[..25]).await.unwrap();
    conn.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    conn.write_all(&bytes[25..]).await.unwrap();

    harness.wait_until(|| harness.store.logs.lock().len() == 2).await;
}

#[tokio::test]
async fn test_interleaved_message_types_on_one_connection() {
    let harness = start_server().await;

    let mut conn = harness.connect().await;
    let stream = format!("{SNAPSHOT_ENVELOPE}\n{LOG_ENVELOPE}\n");
    conn.write_all(stream.as_bytes()).await.unwrap();

    harness.wait_until(|| {
        harness.store.files.lock().len() == 1 && harness.store.logs.lock().len() == 2
    })
    .await;
}

#[tokio::test]
async fn test_malformed_stream_is_fatal_to_that_connection_only() {
    let harness = start_server().await;

    let mut bad = harness.connect().await;
    bad.write_all(b"this is not json").await.unwrap();

    // The server closes the bad connection; the client observes EOF
    let mut buf = [0u8; 1];
    let n = timeout(Duration::from_secs(5), bad.read(&mut buf))
        .await
        .expect("server did not close the connection")
        .unwrap();
    assert_eq!(n, 0);

    // The server itself is unaffected
    let mut good = harness.connect().await;
    good.write_all(LOG_ENVELOPE.as_bytes()).await.unwrap();
    harness.wait_until(|| harness.store.logs.lock().len() == 2).await;
}

#[tokio::test]
async fn test_graceful_shutdown_closes_connections() {
    let harness = start_server().await;

    let mut conns = Vec::new();
    for _ in 0..4 {
        conns.push(harness.connect().await);
    }
    harness
        .wait_until(|| harness.server.connection_count() == 4)
        .await;

    harness.cancel.cancel();
    let result = timeout(Duration::from_secs(10), harness.run)
        .await
        .expect("server did not stop within the drain deadline")
        .expect("server task panicked");
    assert!(result.is_ok());
    assert_eq!(harness.server.connection_count(), 0);

    // Every client sees its connection closed
    for conn in &mut conns {
        let mut buf = [0u8; 1];
        let n = timeout(Duration::from_secs(2), conn.read(&mut buf))
            .await
            .expect("connection not closed")
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    let harness = start_server().await;
    let addr = harness.server.local_addr().unwrap();

    let store = Arc::new(RecordingStore::default());
    let router = Arc::new(Router::new(
        store as Arc<dyn Store>,
        Arc::new(FileMirror::new()),
        Arc::new(Broadcaster::new(FanoutCapacities::default())),
        1_000,
    ));

    let conflict = AgentServer::bind(AgentServerConfig::with_addr(addr.to_string()), router).await;
    assert!(matches!(conflict, Err(diag_ingest::IngestError::Bind { .. })));
}
