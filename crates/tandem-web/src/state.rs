//! Shared application state for the web server.
//!
//! [`AppState`] is wrapped in an `Arc` and shared across all request
//! handlers. The engine inside is cheap to clone and carries its own
//! per-session locking, so handlers need no extra synchronization.

use std::time::Instant;

use tandem_intent::WorkflowEngine;

use crate::WebConfig;

/// Shared state accessible from every Axum handler.
#[derive(Clone)]
pub struct AppState {
    /// Routing, interaction, and dispatch for every session.
    pub engine: WorkflowEngine,

    /// Web server configuration.
    pub config: WebConfig,

    /// When the server state was built, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: WorkflowEngine, config: WebConfig) -> Self {
        Self {
            engine,
            config,
            started_at: Instant::now(),
        }
    }
}
