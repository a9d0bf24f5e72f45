//! diagd - diagnostic telemetry collector
//!
//! Server-side collector for agent telemetry: ingests packet metrics,
//! filesystem snapshots and tailed logs over TCP, persists them to
//! Postgres, and streams live events to WebSocket subscribers.
//!
//! ```bash
//! diagd
//! diagd --log-level debug
//! AGENT_ADDR=:9091 SERVER_ADDR=:9090 diagd
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use diag_gateway::{AppState, Gateway};
use diag_ingest::{AgentServer, AgentServerConfig};
use diag_pipeline::{Broadcaster, FanoutCapacities, FileMirror, Router, Store};
use diag_storage::{HistoryStore, PgStore};

use crate::config::Config;

/// Per-session file-update queue capacity
const FILE_QUEUE_CAPACITY: usize = 2_000;

/// Bound on joining each component task at shutdown; the agent server
/// has its own 10-second connection drain inside this window
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(15);

/// Diagnostic telemetry collector
#[derive(Parser, Debug)]
#[command(name = "diagd")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config::from_env();
    tracing::info!(
        agent_addr = %config.agent_bind_addr(),
        server_addr = %config.server_bind_addr(),
        batch_size = config.batch_size,
        "starting diagd"
    );

    // Storage first; nothing works without it
    let store = Arc::new(
        PgStore::connect(&config.database_url)
            .await
            .context("database connection failed")?,
    );
    store.init_schema().await.context("schema init failed")?;

    // Mirror reflects storage exactly once, before any ingest
    let mirror = Arc::new(FileMirror::new());
    let records = store.load_files().await.context("mirror seed failed")?;
    tracing::info!(files = records.len(), "file mirror seeded");
    mirror.seed(records);

    let broadcaster = Arc::new(Broadcaster::new(FanoutCapacities {
        packets: config.network_buffer_size,
        logs: config.log_buffer_size,
        files: FILE_QUEUE_CAPACITY,
    }));

    let router = Arc::new(Router::new(
        Arc::clone(&store) as Arc<dyn Store>,
        Arc::clone(&mirror),
        Arc::clone(&broadcaster),
        config.batch_size,
    ));

    let cancel = CancellationToken::new();

    // Agent ingest server
    let agent_server = Arc::new(
        AgentServer::bind(
            AgentServerConfig::with_addr(config.agent_bind_addr()),
            Arc::clone(&router),
        )
        .await?,
    );
    let ingest_task: JoinHandle<()> = {
        let server = Arc::clone(&agent_server);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = server.run(cancel).await {
                tracing::error!(error = %e, "agent server failed");
            }
        })
    };

    // Subscriber gateway
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn HistoryStore>,
        Arc::clone(&broadcaster),
        cancel.clone(),
    );
    let gateway = Gateway::bind(&config.server_bind_addr(), state).await?;
    let gateway_task: JoinHandle<()> = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway.run(cancel).await {
                tracing::error!(error = %e, "gateway failed");
            }
        })
    };

    // Time-triggered packet flush
    let flush_task: JoinHandle<()> = {
        let router = Arc::clone(&router);
        let cancel = cancel.clone();
        tokio::spawn(async move { router.run_flush_timer(cancel).await })
    };

    shutdown_signal().await;
    tracing::info!("shutdown signal received");
    cancel.cancel();

    // Ingest drains first so the final flush below sees the last
    // packets the readers decoded
    join_bounded("agent server", ingest_task).await;
    join_bounded("packet flush timer", flush_task).await;
    router.flush_remaining().await;

    // Sessions lose pending broadcasts by design
    broadcaster.close_all();
    join_bounded("gateway", gateway_task).await;

    store.close().await;
    tracing::info!("diagd stopped");
    Ok(())
}

/// Join a component task, logging instead of hanging on a straggler
async fn join_bounded(name: &str, task: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
        Ok(Ok(())) => {}
        Ok(Err(join_error)) => {
            tracing::warn!(component = name, error = %join_error, "task panicked");
        }
        Err(_) => tracing::warn!(component = name, "task did not stop in time"),
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
