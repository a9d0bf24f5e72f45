//! Diagnostic telemetry - subscriber gateway
//!
//! One axum server carrying both subscriber surfaces:
//!
//! - `GET /ws` upgrades to a WebSocket session that multiplexes the
//!   three live event classes with per-session log filtering
//! - `GET /api/*` serves history queries as thin wrappers over storage
//!
//! Sessions register with the router's broadcaster on upgrade and are
//! deregistered on any exit path; a slow or dead subscriber only ever
//! loses its own events.

mod error;
mod routes;
mod server;
mod session;
mod state;

pub use error::{ApiError, GatewayError, Result};
pub use routes::build_router;
pub use server::Gateway;
pub use state::AppState;
