//! OpenAI-compatible chat client.
//!
//! Talks to any endpoint that implements the Chat Completions API (Groq,
//! OpenAI, vLLM, Ollama) in non-streaming JSON mode. Question generation and
//! sales synthesis both go through [`LlmClient::chat_json`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::llm::types::{ChatRequest, Message};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default base URL (Groq's OpenAI-compatible endpoint).
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model for question generation.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Configuration for a single chat endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Bearer token. An empty key is accepted at construction time and
    /// reported as [`AgentError::MissingApiKey`] on every call.
    pub api_key: String,
    /// Base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Model used when a request leaves `model` empty.
    pub default_model: String,
    /// Default maximum tokens per response.
    pub max_tokens: u32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl LlmClientConfig {
    /// Configuration for Groq with the default model.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GROQ_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }

    /// Configuration for any OpenAI-compatible endpoint.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: model.into(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A chat client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client with the given configuration.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    /// The model used when a request leaves `model` empty.
    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Send a chat request and return the message content as raw text.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        if self.config.api_key.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: self.config.base_url.clone(),
            });
        }

        let body = self.build_request_body(request);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", self.config.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("invalid authorization header: {e}"),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!(url = %url, model = %body["model"], "sending LLM request");

        let resp = self.http.post(&url).headers(headers).json(&body).send().await?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AgentError::LlmRequestFailed {
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        parse_message_content(&v)
    }

    /// Send a chat request and parse the reply as a JSON object.
    pub async fn chat_json(&self, request: &ChatRequest) -> Result<Value> {
        let content = self.chat(request).await?;
        let cleaned = strip_code_fences(&content);
        serde_json::from_str(cleaned).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("model did not return valid JSON: {e}"),
        })
    }

    fn build_request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();

        let mut body = json!({
            "model": if request.model.is_empty() {
                self.config.default_model.as_str()
            } else {
                request.model.as_str()
            },
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": messages,
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if request.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

fn message_to_wire(message: &Message) -> Value {
    json!({ "role": message.role, "content": message.content })
}

/// Extract `choices[0].message.content` from a Chat Completions response.
pub fn parse_message_content(v: &Value) -> Result<String> {
    v["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "missing `choices[0].message.content` in response".into(),
        })
}

/// Remove a surrounding Markdown code fence (```json ... ```), if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_default_model_and_json_mode() {
        let client = LlmClient::new(LlmClientConfig::groq("key")).unwrap();
        let request = ChatRequest::json("", "Return JSON", 0.4);
        let body = client.build_request_body(&request);

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!((body["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn parses_message_content() {
        let v = json!({ "choices": [{ "message": { "content": "{\"a\":1}" } }] });
        assert_eq!(parse_message_content(&v).unwrap(), "{\"a\":1}");

        let err = parse_message_content(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, AgentError::LlmParseFailed { .. }));
    }

    #[test]
    fn strips_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("  {\"b\":2} "), "{\"b\":2}");
    }

    #[tokio::test]
    async fn empty_api_key_fails_every_call() {
        let client = LlmClient::new(LlmClientConfig::groq("")).unwrap();
        let err = client.chat(&ChatRequest::json("", "hi", 0.0)).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingApiKey { .. }));
        assert!(!err.is_transient());
    }
}
