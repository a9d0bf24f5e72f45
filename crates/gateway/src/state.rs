//! Shared handler state

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use diag_pipeline::Broadcaster;
use diag_storage::HistoryStore;

/// State shared by every gateway handler
#[derive(Clone)]
pub struct AppState {
    /// History queries for the REST surface
    pub history: Arc<dyn HistoryStore>,
    /// Live event registry for WebSocket sessions
    pub broadcaster: Arc<Broadcaster>,
    /// Root cancellation; ends every live session on shutdown
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(
        history: Arc<dyn HistoryStore>,
        broadcaster: Arc<Broadcaster>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            history,
            broadcaster,
            cancel,
        }
    }
}
