//! LLM integration layer.
//!
//! - [`types`] -- Request and message types.
//! - [`client`] -- HTTP client for OpenAI-compatible chat endpoints.

pub mod client;
pub mod types;

pub use client::{LlmClient, LlmClientConfig};
pub use types::{ChatRequest, Message, Role};
