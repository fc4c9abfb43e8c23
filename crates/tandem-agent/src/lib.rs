//! External collaborators for tandem.
//!
//! The workflow engine never talks to a network service directly. It holds a
//! [`Collaborators`] bundle of trait objects, built once at startup:
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │   WorkflowEngine     │
//!                 └──────────┬───────────┘
//!        ┌──────────────┬────┴─────────┬───────────────┐
//!  ┌─────┴──────┐ ┌─────┴──────┐ ┌─────┴──────┐ ┌──────┴─────┐
//!  │ Questions  │ │ Classifier │ │ Synthesizer│ │   Images   │
//!  │ (LLM JSON) │ │ (HF BERT)  │ │ (LLM JSON) │ │ (/images)  │
//!  └────────────┘ └────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`collaborator`] -- The four collaborator traits and their shared types.
//! - [`llm`] -- OpenAI-compatible chat client in JSON mode.
//! - [`generator`] -- LLM-backed question generation.
//! - [`classifier`] -- Hugging Face sales-intent classifier.
//! - [`synthesis`] -- LLM-backed sales synthesis.
//! - [`image`] -- HTTP image generator.
//! - [`retry`] -- Deadlines and bounded retries.
//! - [`config`] -- Credentials and collaborator construction.
//! - [`error`] -- Agent error types.

pub mod classifier;
pub mod collaborator;
pub mod config;
pub mod error;
pub mod generator;
pub mod image;
pub mod llm;
pub mod retry;
pub mod synthesis;

pub use classifier::{HfIntentClassifier, UNKNOWN_INTENT, label_name};
pub use collaborator::{
    DayIntent, ImageGenerator, IntentClassifier, QuestionGenerator, SalesAnalysis,
    SalesSynthesizer,
};
pub use config::{CollaboratorConfig, Collaborators};
pub use error::{AgentError, Result};
pub use generator::{LlmQuestionGenerator, MAX_SALES_QUESTIONS};
pub use image::HttpImageGenerator;
pub use llm::{ChatRequest, LlmClient, LlmClientConfig, Message, Role};
pub use retry::{RetryPolicy, retry, with_timeout};
pub use synthesis::LlmSalesSynthesizer;
