//! Workflow engine error types.
//!
//! Collaborator failures are absorbed inside the engine; only the variants
//! below cross the engine boundary. Callers match on the variant, never on
//! message text.

use tandem_agent::AgentError;
use tandem_store::StoreError;

/// Unified error type for the workflow engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Caller errors -------------------------------------------------------
    /// The session token is unknown or has been pruned.
    #[error("session not found: {token}")]
    SessionNotFound { token: String },

    // -- Dispatch errors -----------------------------------------------------
    /// The poster image could not be produced. The session stays complete
    /// but undelivered; resuming it retries the dispatch.
    #[error("poster image generation failed: {reason}")]
    ImageGenerationFailed { reason: String },

    // -- Registry errors -----------------------------------------------------
    /// An app registry override file could not be read or parsed.
    #[error("failed to load app registry from {path}: {reason}")]
    RegistryLoad { path: String, reason: String },

    /// A built-in pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    // -- Upstream crate errors -----------------------------------------------
    /// A checkpoint store operation failed.
    #[error("store error: {0}")]
    Store(StoreError),

    /// A collaborator error that no fallback absorbed.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;

impl From<StoreError> for IntentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => Self::SessionNotFound { token: id },
            other => Self::Store(other),
        }
    }
}

impl IntentError {
    /// Short machine-readable tag for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionNotFound { .. } => "session_not_found",
            Self::ImageGenerationFailed { .. } => "image_generation_failed",
            Self::RegistryLoad { .. } => "registry_load",
            Self::Pattern(_) => "pattern",
            Self::Store(_) => "store",
            Self::Agent(_) => "agent",
            Self::Json(_) => "json",
        }
    }
}
