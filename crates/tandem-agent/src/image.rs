//! Image generation through an OpenAI-style `/images/generations` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::collaborator::ImageGenerator;
use crate::error::{AgentError, Result};

/// Default image API base URL.
pub const IMAGE_BASE_URL: &str = "https://api.a4f.co/v1";
/// Default image model.
pub const IMAGE_MODEL: &str = "provider-4/imagen-4";
/// Default output size.
pub const IMAGE_SIZE: &str = "1024x1024";

/// Where the generated image can be fetched from.
#[derive(Debug, PartialEq, Eq)]
enum ImageSource {
    Url(String),
    Inline(String),
}

/// HTTP image generator: requests one image, then downloads it.
#[derive(Debug, Clone)]
pub struct HttpImageGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl HttpImageGenerator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| failed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: IMAGE_MODEL.to_owned(),
            size: IMAGE_SIZE.to_owned(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "downloading generated image");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| failed(format!("download failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(failed(format!("download returned {}", resp.status())));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| failed(format!("download body unreadable: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        // A missing key is terminal for the poster dispatch, so it surfaces
        // as an image failure rather than a missing-key error.
        if self.api_key.is_empty() {
            return Err(failed("IMAGEGEN_API_KEY is not set".into()));
        }

        let url = format!("{}/images/generations", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
        });

        tracing::info!(model = %self.model, "requesting poster image");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(failed(format!("API returned {status}: {text}")));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| failed(format!("invalid response: {e}")))?;

        match image_source(&v)? {
            ImageSource::Url(url) => self.download(&url).await,
            ImageSource::Inline(b64) => STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| failed(format!("invalid inline image: {e}"))),
        }
    }
}

fn image_source(v: &Value) -> Result<ImageSource> {
    let entry = &v["data"][0];
    if let Some(url) = entry["url"].as_str() {
        return Ok(ImageSource::Url(url.to_owned()));
    }
    if let Some(b64) = entry["b64_json"].as_str() {
        return Ok(ImageSource::Inline(b64.to_owned()));
    }
    Err(failed("response carries neither `url` nor `b64_json`".into()))
}

fn failed(reason: String) -> AgentError {
    AgentError::ImageGenerationFailed { reason }
}
