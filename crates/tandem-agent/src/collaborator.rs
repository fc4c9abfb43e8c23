//! Collaborator contracts.
//!
//! The workflow engine talks to the outside world only through these traits.
//! Production implementations live in [`crate::generator`],
//! [`crate::classifier`], [`crate::synthesis`] and [`crate::image`]; tests
//! substitute hand-written mocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tandem_store::{AnswerBatch, Question};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Intent label for one day-chunk of a sales conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayIntent {
    /// The marker that opened the chunk, e.g. `"Day 3:"`.
    pub day: String,
    pub intent: String,
    pub text_preview: String,
}

/// Output of the sales synthesis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesAnalysis {
    pub summary: String,
    pub overall_intent: String,
    pub next_best_action: String,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Produces follow-up questions once the foundational answers are in.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Clarifying questions for a sales conversation. `collected` carries at
    /// least `conversation` and `operation`.
    async fn sales_questions(&self, collected: &AnswerBatch) -> Result<Vec<Question>>;

    /// Grouped poster questions derived from the user's core idea and the
    /// prompt skeleton the answers will be substituted into.
    async fn poster_questions(&self, main_idea: &str, skeleton: &str) -> Result<Vec<Question>>;
}

/// Labels a single chunk of conversation text.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<String>;
}

/// Condenses a conversation and its per-day labels into a recommendation.
#[async_trait]
pub trait SalesSynthesizer: Send + Sync {
    async fn synthesize(&self, conversation: &str, days: &[DayIntent]) -> Result<SalesAnalysis>;
}

/// Renders a text prompt into image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}
