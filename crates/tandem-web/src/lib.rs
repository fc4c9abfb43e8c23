//! Web interface for tandem.
//!
//! This crate exposes the workflow engine over HTTP:
//!
//! - `POST /generate` and `POST /continue` for session turns.
//! - `GET /api/status` and `GET /api/sessions/{id}` for inspection.

pub mod api;
pub mod server;
pub mod state;

pub use server::WebServer;
pub use state::AppState;

/// Web server configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// The address to bind the HTTP server to.
    pub bind_addr: String,
    /// The port to listen on.
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 8000,
        }
    }
}
