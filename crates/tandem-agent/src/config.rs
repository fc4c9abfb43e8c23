//! Collaborator wiring.
//!
//! Every external client is built once at startup from a
//! [`CollaboratorConfig`] and handed to the workflow engine as a
//! [`Collaborators`] bundle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::classifier::{HF_INTENT_MODEL_URL, HfIntentClassifier};
use crate::collaborator::{ImageGenerator, IntentClassifier, QuestionGenerator, SalesSynthesizer};
use crate::error::Result;
use crate::generator::LlmQuestionGenerator;
use crate::image::{HttpImageGenerator, IMAGE_BASE_URL};
use crate::llm::client::{DEFAULT_MODEL, GROQ_BASE_URL};
use crate::llm::{LlmClient, LlmClientConfig};
use crate::synthesis::LlmSalesSynthesizer;

/// Endpoints, models and credentials for all collaborators.
#[derive(Clone)]
pub struct CollaboratorConfig {
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub hf_token: String,
    pub classifier_url: String,
    pub image_api_key: String,
    pub image_base_url: String,
    /// HTTP timeout applied by each client.
    pub http_timeout: Duration,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_base_url: GROQ_BASE_URL.to_owned(),
            llm_model: DEFAULT_MODEL.to_owned(),
            hf_token: String::new(),
            classifier_url: HF_INTENT_MODEL_URL.to_owned(),
            image_api_key: String::new(),
            image_base_url: IMAGE_BASE_URL.to_owned(),
            http_timeout: Duration::from_secs(60),
        }
    }
}

// Keys stay out of logs.
impl fmt::Debug for CollaboratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollaboratorConfig")
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .field("hf_token", &redact(&self.hf_token))
            .field("classifier_url", &self.classifier_url)
            .field("image_api_key", &redact(&self.image_api_key))
            .field("image_base_url", &self.image_base_url)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<set>" }
}

impl CollaboratorConfig {
    /// Read credentials from `GROQ_API_KEY`, `HUGGINGFACE_TOKEN` and
    /// `IMAGEGEN_API_KEY`. Unset variables leave the key empty; the affected
    /// collaborator then fails every call.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let config = Self {
            llm_api_key: var("GROQ_API_KEY"),
            hf_token: var("HUGGINGFACE_TOKEN"),
            image_api_key: var("IMAGEGEN_API_KEY"),
            ..Self::default()
        };

        for (name, value) in [
            ("GROQ_API_KEY", &config.llm_api_key),
            ("HUGGINGFACE_TOKEN", &config.hf_token),
            ("IMAGEGEN_API_KEY", &config.image_api_key),
        ] {
            if value.is_empty() {
                tracing::warn!(var = name, "credential not set, collaborator will fall back");
            }
        }

        config
    }

    /// Construct the HTTP-backed collaborators.
    pub fn build(&self) -> Result<Collaborators> {
        let llm = LlmClient::new(LlmClientConfig {
            timeout: self.http_timeout,
            ..LlmClientConfig::openai_compatible(
                self.llm_api_key.clone(),
                self.llm_model.clone(),
                self.llm_base_url.clone(),
            )
        })?;

        Ok(Collaborators {
            questions: Arc::new(LlmQuestionGenerator::new(llm.clone())),
            classifier: Arc::new(HfIntentClassifier::new(
                self.classifier_url.clone(),
                self.hf_token.clone(),
                self.http_timeout,
            )?),
            synthesizer: Arc::new(LlmSalesSynthesizer::new(llm)),
            images: Arc::new(HttpImageGenerator::new(
                self.image_base_url.clone(),
                self.image_api_key.clone(),
                self.http_timeout,
            )?),
        })
    }
}

/// The full set of collaborators the workflow engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub questions: Arc<dyn QuestionGenerator>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub synthesizer: Arc<dyn SalesSynthesizer>,
    pub images: Arc<dyn ImageGenerator>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
