//! Wire-neutral types for LLM chat requests.

use serde::{Deserialize, Serialize};

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions that shape model behavior.
    System,
    /// Input from the human user.
    User,
    /// Output from the LLM.
    Assistant,
}

/// A single message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A full request to send to an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Model identifier; empty means the client default.
    pub model: String,

    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate.
    pub max_tokens: Option<u32>,

    /// Ask the provider for a JSON object response.
    pub json_mode: bool,
}

impl ChatRequest {
    /// A single system-prompt request in JSON mode.
    pub fn json(model: impl Into<String>, system_prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::system(system_prompt)],
            temperature: Some(temperature),
            max_tokens: None,
            json_mode: true,
        }
    }
}
