//! Sales-intent classification through the Hugging Face Inference API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::collaborator::IntentClassifier;
use crate::error::{AgentError, Result};

/// Hosted fine-tuned BERT model for sales intent.
pub const HF_INTENT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/Sanji8421/fine_tuned_BERT";

/// Label returned when the model answers with something unmapped.
pub const UNKNOWN_INTENT: &str = "Unknown Intent";

/// Map a raw `LABEL_n` from the model to a human-readable intent.
pub fn label_name(label: &str) -> &'static str {
    match label {
        "LABEL_0" => "Enrolled",
        "LABEL_1" => "Ghosted",
        "LABEL_2" => "Information Gathering",
        "LABEL_3" => "Interested",
        "LABEL_4" => "Meeting Scheduled",
        "LABEL_5" => "Not Interested",
        "LABEL_6" => "Price Concern",
        "LABEL_7" => "Wants Demo",
        _ => UNKNOWN_INTENT,
    }
}

/// Classifier that posts `{"inputs": text}` to a text-classification
/// endpoint and takes the top-ranked label.
#[derive(Debug, Clone)]
pub struct HfIntentClassifier {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HfIntentClassifier {
    pub fn new(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::ClassifierFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            url: url.into(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl IntentClassifier for HfIntentClassifier {
    async fn classify(&self, text: &str) -> Result<String> {
        if self.token.is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: "huggingface".into(),
            });
        }

        let preview: String = text.chars().take(50).collect();
        tracing::debug!(chunk = %preview, "classifying sales intent");

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| AgentError::ClassifierFailed {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::ClassifierFailed {
                reason: format!("classifier returned {status}: {body}"),
            });
        }

        let body: Value = resp.json().await.map_err(|e| AgentError::ClassifierFailed {
            reason: format!("invalid classifier response: {e}"),
        })?;

        Ok(top_label(&body).to_owned())
    }
}

/// Pick the intent out of a `[[{"label": .., "score": ..}, ..]]` response.
///
/// The endpoint ranks labels by score, so the first entry wins. An empty
/// or unexpected payload yields [`UNKNOWN_INTENT`].
pub fn top_label(body: &Value) -> &'static str {
    body[0][0]["label"]
        .as_str()
        .map_or(UNKNOWN_INTENT, label_name)
}
