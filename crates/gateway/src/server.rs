//! Gateway HTTP server

use std::io;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};
use crate::routes::build_router;
use crate::state::AppState;

/// Bound gateway server, ready to run
pub struct Gateway {
    listener: TcpListener,
    state: AppState,
}

impl Gateway {
    /// Bind the listener; fails fast when the address is taken
    pub async fn bind(addr: &str, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        tracing::info!(addr = %addr, "gateway listening");
        Ok(Self { listener, state })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until cancellation
    ///
    /// Graceful shutdown stops accepting and lets in-flight requests
    /// finish; live WebSocket sessions exit through the same token via
    /// their write pumps.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let app = build_router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!("gateway stopped");
        Ok(())
    }
}
