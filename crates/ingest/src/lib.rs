//! Diagnostic telemetry - agent ingest server
//!
//! Accepts long-lived framed TCP connections from remote agents and
//! feeds decoded envelopes to the router. One reader task per
//! connection; envelope processing within a connection is serialized,
//! nothing is ordered across connections.
//!
//! A connection failure is always fatal to that connection and never
//! to the server; agents are expected to reconnect and retransmit.

mod error;
mod server;

pub use error::{IngestError, Result};
pub use server::{AgentServer, AgentServerConfig};
