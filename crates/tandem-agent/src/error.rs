//! Collaborator error types.
//!
//! Every external call surfaces failures through [`AgentError`]. Callers in
//! the workflow engine absorb most of them with a fallback; only
//! [`AgentError::ImageGenerationFailed`] is meant to reach the end user.

use std::time::Duration;

/// Unified error type for external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- LLM errors ----------------------------------------------------------
    /// An HTTP request to the LLM provider failed.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The LLM response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    // -- Classifier errors ---------------------------------------------------
    /// The intent classifier returned an error or an unusable payload.
    #[error("intent classification failed: {reason}")]
    ClassifierFailed { reason: String },

    // -- Image errors --------------------------------------------------------
    /// The image could not be generated or downloaded.
    #[error("image generation failed: {reason}")]
    ImageGenerationFailed { reason: String },

    // -- Transport -----------------------------------------------------------
    /// A collaborator call exceeded its deadline.
    #[error("{collaborator} timed out after {after:?}")]
    Timeout {
        collaborator: &'static str,
        after: Duration,
    },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    /// Whether retrying the same call could plausibly succeed.
    ///
    /// A missing API key fails identically on every attempt.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::MissingApiKey { .. })
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}
