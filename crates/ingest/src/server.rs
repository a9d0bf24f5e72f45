//! Agent TCP server
//!
//! Accept loop plus one reader task per connection. Connections are
//! tracked in an active-set so shutdown can report what it is waiting
//! for; reader tasks are joined through a `JoinSet` with a bounded
//! drain deadline.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use diag_pipeline::Router;
use diag_protocol::EnvelopeDecoder;

use crate::error::{IngestError, Result};

/// Default agent listen address
const DEFAULT_ADDR: &str = "0.0.0.0:8081";

/// OS keepalive probe period for idle agent connections
const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);

/// How long shutdown waits for connection readers to exit
const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Read chunk size per connection
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Agent server configuration
#[derive(Debug, Clone)]
pub struct AgentServerConfig {
    /// Bind address, e.g. `0.0.0.0:8081`
    pub addr: String,

    /// TCP keepalive probe period
    pub keepalive: Duration,

    /// Bound on waiting for per-connection readers at shutdown
    pub drain_timeout: Duration,

    /// Per-envelope size cap handed to the stream decoder
    pub max_envelope_size: usize,
}

impl Default for AgentServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.into(),
            keepalive: DEFAULT_KEEPALIVE,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            max_envelope_size: diag_protocol::DEFAULT_MAX_ENVELOPE_SIZE,
        }
    }
}

impl AgentServerConfig {
    /// Create config with a custom bind address
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }
}

/// Framed TCP server for agent connections
pub struct AgentServer {
    config: AgentServerConfig,
    listener: TcpListener,
    router: Arc<Router>,
    active: Arc<Mutex<HashMap<u64, SocketAddr>>>,
    next_conn_id: AtomicU64,
}

impl AgentServer {
    /// Bind the listener; fails fast when the address is taken
    pub async fn bind(config: AgentServerConfig, router: Arc<Router>) -> Result<Self> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|source| IngestError::Bind {
                addr: config.addr.clone(),
                source,
            })?;

        tracing::info!(addr = %config.addr, "agent server listening");

        Ok(Self {
            config,
            listener,
            router,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_conn_id: AtomicU64::new(1),
        })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of currently tracked agent connections
    pub fn connection_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Accept connections until cancellation or listener failure
    ///
    /// On return every accepted connection has been closed and its
    /// reader joined, up to the drain deadline. An accept error during
    /// steady state is returned; during shutdown it is suppressed.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // Child token so an accept failure can stop the readers without
        // touching the caller's tree
        let conn_cancel = cancel.child_token();
        let mut readers = JoinSet::new();

        let result = loop {
            // Reap finished readers so the set stays bounded by the
            // number of live connections
            while readers.try_join_next().is_some() {}

            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        self.spawn_reader(&mut readers, stream, peer, &conn_cancel);
                    }
                    Err(e) => {
                        if cancel.is_cancelled() {
                            break Ok(());
                        }
                        break Err(IngestError::Accept(e));
                    }
                },
            }
        };

        conn_cancel.cancel();
        self.drain(readers).await;

        tracing::info!("agent server stopped");
        result
    }

    /// Register, configure and spawn one connection reader
    fn spawn_reader(
        &self,
        readers: &mut JoinSet<()>,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: &CancellationToken,
    ) {
        let id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.active.lock().insert(id, peer);
        tracing::info!(conn_id = id, peer = %peer, "agent connected");

        configure_keepalive(&stream, self.config.keepalive);

        let reader = ConnectionReader {
            id,
            peer,
            router: Arc::clone(&self.router),
            max_envelope_size: self.config.max_envelope_size,
        };
        let active = Arc::clone(&self.active);
        let cancel = cancel.clone();

        readers.spawn(async move {
            match reader.run(stream, cancel.clone()).await {
                Ok(()) => tracing::info!(conn_id = id, peer = %peer, "agent disconnected"),
                Err(e) => {
                    // Routine resets during shutdown are not noteworthy
                    if !cancel.is_cancelled() {
                        tracing::warn!(conn_id = id, peer = %peer, error = %e, "agent connection closed");
                    }
                }
            }
            active.lock().remove(&id);
        });
    }

    /// Join reader tasks, bounded by the drain deadline
    async fn drain(&self, mut readers: JoinSet<()>) {
        let deadline = self.config.drain_timeout;
        let drained = tokio::time::timeout(deadline, async {
            while readers.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            let stragglers = self.connection_count();
            tracing::warn!(
                stragglers,
                timeout_secs = deadline.as_secs(),
                "connection drain timed out, aborting readers"
            );
            readers.abort_all();
        }
    }
}

impl std::fmt::Debug for AgentServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServer")
            .field("addr", &self.config.addr)
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// One agent connection's reader
struct ConnectionReader {
    id: u64,
    peer: SocketAddr,
    router: Arc<Router>,
    max_envelope_size: usize,
}

impl ConnectionReader {
    /// Decode envelopes sequentially until EOF, error or cancellation
    ///
    /// Cancellation returns out of the loop, which drops the socket and
    /// thereby force-closes the connection.
    async fn run(&self, mut stream: TcpStream, cancel: CancellationToken) -> Result<()> {
        let mut decoder = EnvelopeDecoder::with_limit(self.max_envelope_size);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            // Drain complete envelopes before reading more; dispatch is
            // serialized within a connection
            while let Some(envelope) = decoder.next_envelope()? {
                tracing::trace!(
                    conn_id = self.id,
                    kind = %envelope.kind,
                    bytes = envelope.payload_len(),
                    "envelope received"
                );
                self.router.dispatch(&envelope).await?;
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),

                read = stream.read(&mut chunk) => {
                    let n = read.map_err(|e| {
                        if is_connection_reset(&e) {
                            tracing::debug!(conn_id = self.id, peer = %self.peer, "connection reset");
                        }
                        IngestError::Io(e)
                    })?;
                    if n == 0 {
                        return Ok(());
                    }
                    decoder.feed(&chunk[..n]);
                }
            }
        }
    }
}

/// Enable OS-level TCP keepalive on an accepted connection
fn configure_keepalive(stream: &TcpStream, period: Duration) {
    let keepalive = TcpKeepalive::new().with_time(period);
    if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        tracing::warn!(error = %e, "failed to set TCP keepalive");
    }
}

/// Expected error kinds when an agent drops the link mid-stream
fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
