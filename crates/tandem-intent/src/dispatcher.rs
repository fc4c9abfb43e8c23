//! Pipeline dispatcher.
//!
//! Turns the answers of a complete session into the pipeline's terminal
//! result. The sales pipeline absorbs every collaborator failure (per-day
//! labels degrade, synthesis falls back to a fixed payload); the poster
//! pipeline has nothing to degrade to, so an image failure is returned as
//! [`IntentError::ImageGenerationFailed`].

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tandem_agent::{
    Collaborators, DayIntent, ImageGenerator, IntentClassifier, RetryPolicy, SalesAnalysis,
    SalesSynthesizer, retry, with_timeout,
};
use tandem_store::{AnswerBatch, Pipeline};
use tracing::{info, warn};

use crate::error::{IntentError, Result};
use crate::poster::PosterTemplate;
use crate::questions::CONVERSATION;
use crate::sales::{DayChunk, DaySplitter};

/// Label recorded for a day whose classification failed on every attempt.
pub const INTENT_PREDICTION_ERROR: &str = "Error in Intent Prediction";

// ═══════════════════════════════════════════════════════════════════════
//  Terminal results
// ═══════════════════════════════════════════════════════════════════════

/// What a finished pipeline hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalResult {
    pub status: String,
    #[serde(flatten)]
    pub payload: PipelineResult,
}

/// Pipeline-specific part of a [`TerminalResult`], tagged by `agent_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent_type", rename_all = "snake_case")]
pub enum PipelineResult {
    Poster {
        image_base64: String,
        image_prompt: String,
        message: String,
    },
    Sales {
        predicted_intent: String,
        next_best_action: String,
        sales_analysis_report: SalesReport,
    },
    Orchestrator {
        message: String,
    },
}

/// Narrative and per-day breakdown of a sales conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub summary: String,
    pub daily_breakdown: Vec<DayIntent>,
}

impl TerminalResult {
    fn success(payload: PipelineResult) -> Self {
        Self {
            status: "success".into(),
            payload,
        }
    }

    /// The result of a service that maps to no pipeline.
    pub fn orchestrator() -> Self {
        Self::success(PipelineResult::Orchestrator {
            message: "Workflow completed!".into(),
        })
    }

    /// The pipeline that produced this result.
    pub fn pipeline(&self) -> Pipeline {
        match self.payload {
            PipelineResult::Poster { .. } => Pipeline::Poster,
            PipelineResult::Sales { .. } => Pipeline::Sales,
            PipelineResult::Orchestrator { .. } => Pipeline::Orchestrator,
        }
    }
}

/// Analysis returned when the synthesis collaborator is unavailable.
pub fn synthesis_fallback() -> SalesAnalysis {
    SalesAnalysis {
        summary: "Failed to generate LLM analysis due to an API error.".into(),
        overall_intent: "Error".into(),
        next_best_action: "Review the conversation manually and check API keys.".into(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Dispatcher
// ═══════════════════════════════════════════════════════════════════════

/// Retry and deadline settings for dispatch-stage collaborators.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Policy for each per-day classification.
    pub classifier: RetryPolicy,
    /// Deadline for synthesis and image generation.
    pub collaborator_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            classifier: RetryPolicy::default(),
            collaborator_timeout: Duration::from_secs(60),
        }
    }
}

/// Forwards collected answers to the terminal pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    classifier: Arc<dyn IntentClassifier>,
    synthesizer: Arc<dyn SalesSynthesizer>,
    images: Arc<dyn ImageGenerator>,
    splitter: DaySplitter,
    template: PosterTemplate,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(collaborators: &Collaborators, config: DispatchConfig) -> Result<Self> {
        Ok(Self {
            classifier: Arc::clone(&collaborators.classifier),
            synthesizer: Arc::clone(&collaborators.synthesizer),
            images: Arc::clone(&collaborators.images),
            splitter: DaySplitter::new()?,
            template: PosterTemplate::new()?,
            config,
        })
    }

    /// Run `pipeline` over `answers`.
    pub async fn dispatch(&self, pipeline: Pipeline, answers: &AnswerBatch) -> Result<TerminalResult> {
        info!(pipeline = %pipeline, answers = answers.len(), "dispatching");
        match pipeline {
            Pipeline::Poster => self.dispatch_poster(answers).await,
            Pipeline::Sales => Ok(self.dispatch_sales(answers).await),
            Pipeline::Orchestrator => Ok(TerminalResult::orchestrator()),
        }
    }

    async fn dispatch_poster(&self, answers: &AnswerBatch) -> Result<TerminalResult> {
        let prompt = self.template.render(answers);

        let bytes = with_timeout(
            "image_generator",
            self.config.collaborator_timeout,
            self.images.generate(&prompt),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "poster image generation failed");
            IntentError::ImageGenerationFailed {
                reason: e.to_string(),
            }
        })?;

        info!(bytes = bytes.len(), "poster image generated");
        Ok(TerminalResult::success(PipelineResult::Poster {
            image_base64: STANDARD.encode(&bytes),
            image_prompt: prompt,
            message: "Poster generated!".into(),
        }))
    }

    async fn dispatch_sales(&self, answers: &AnswerBatch) -> TerminalResult {
        let conversation = answers
            .get(CONVERSATION)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        let chunks = self.splitter.split(&conversation);
        info!(days = chunks.len(), "sales conversation split");

        let mut daily_breakdown = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            daily_breakdown.push(DayIntent {
                day: chunk.day.clone(),
                intent: self.classify_day(chunk).await,
                text_preview: chunk.preview(),
            });
        }

        let analysis = with_timeout(
            "sales_synthesizer",
            self.config.collaborator_timeout,
            self.synthesizer.synthesize(&conversation, &daily_breakdown),
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "sales synthesis failed, using fallback analysis");
            synthesis_fallback()
        });

        TerminalResult::success(PipelineResult::Sales {
            predicted_intent: analysis.overall_intent,
            next_best_action: analysis.next_best_action,
            sales_analysis_report: SalesReport {
                summary: analysis.summary,
                daily_breakdown,
            },
        })
    }

    /// Classify one day, retrying per policy; exhaustion yields
    /// [`INTENT_PREDICTION_ERROR`].
    pub async fn classify_day(&self, chunk: &DayChunk) -> String {
        let classifier = Arc::clone(&self.classifier);
        let text = chunk.content.as_str();

        retry("intent_classifier", self.config.classifier, || {
            classifier.classify(text)
        })
        .await
        .unwrap_or_else(|e| {
            warn!(day = %chunk.day, error = %e, "intent classification failed");
            INTENT_PREDICTION_ERROR.to_owned()
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
