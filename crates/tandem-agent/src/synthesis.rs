//! LLM-backed sales synthesis.

use async_trait::async_trait;
use serde_json::Value;

use crate::collaborator::{DayIntent, SalesAnalysis, SalesSynthesizer};
use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LlmClient};

/// Model used for the sales analysis.
pub const SYNTHESIS_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

const SYNTHESIS_TEMPERATURE: f32 = 0.3;

/// Synthesizes a summary, overall intent and next best action from the full
/// conversation and its per-day classifications.
#[derive(Debug, Clone)]
pub struct LlmSalesSynthesizer {
    client: LlmClient,
    model: String,
}

impl LlmSalesSynthesizer {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            model: SYNTHESIS_MODEL.to_owned(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SalesSynthesizer for LlmSalesSynthesizer {
    async fn synthesize(&self, conversation: &str, days: &[DayIntent]) -> Result<SalesAnalysis> {
        let daily = serde_json::to_string_pretty(days)?;
        let prompt = synthesis_prompt(conversation, &daily);

        let reply = self
            .client
            .chat_json(&ChatRequest::json(
                self.model.as_str(),
                prompt,
                SYNTHESIS_TEMPERATURE,
            ))
            .await?;

        let analysis = parse_analysis(&reply)?;
        tracing::info!(overall_intent = %analysis.overall_intent, "sales analysis generated");
        Ok(analysis)
    }
}

/// Read the three analysis fields, each required to be a non-empty string.
pub fn parse_analysis(reply: &Value) -> Result<SalesAnalysis> {
    let field = |key: &str| -> Result<String> {
        reply[key]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| AgentError::LlmParseFailed {
                reason: format!("analysis is missing `{key}`"),
            })
    };

    Ok(SalesAnalysis {
        summary: field("summary")?,
        overall_intent: field("overall_intent")?,
        next_best_action: field("next_best_action")?,
    })
}

fn synthesis_prompt(conversation: &str, daily: &str) -> String {
    format!(
        r#"You are a world-class senior sales analyst. Analyze the sales conversation by synthesizing the raw text with the pre-computed day-by-day intent analysis.

Your output MUST be a JSON object with exactly three keys:
- "summary": a 2-3 sentence narrative of the sales cycle: how it started, the key turning points, and where it stands now.
- "overall_intent": the customer's current primary intent, weighted toward the most recent interactions.
- "next_best_action": a single, concrete, actionable next step for the sales representative.

FULL CONVERSATION:
---
{conversation}
---

DAILY INTENT ANALYSIS:
---
{daily}
---

Provide your final analysis as a JSON object only.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_complete_analysis() {
        let reply = json!({
            "summary": "Started cold, warmed up after the demo.",
            "overall_intent": "Ready to Schedule",
            "next_best_action": "Send a calendar invite for Thursday."
        });
        let analysis = parse_analysis(&reply).unwrap();
        assert_eq!(analysis.overall_intent, "Ready to Schedule");
    }

    #[test]
    fn blank_field_is_a_parse_error() {
        let reply = json!({
            "summary": "ok",
            "overall_intent": "  ",
            "next_best_action": "call"
        });
        let err = parse_analysis(&reply).unwrap_err();
        assert!(err.to_string().contains("overall_intent"));
    }

    #[test]
    fn prompt_includes_daily_breakdown() {
        let days = vec![DayIntent {
            day: "Day 1:".into(),
            intent: "Interested".into(),
            text_preview: "Hi there...".into(),
        }];
        let daily = serde_json::to_string_pretty(&days).unwrap();
        let prompt = synthesis_prompt("Day 1: Hi there", &daily);
        assert!(prompt.contains("\"intent\": \"Interested\""));
        assert!(prompt.contains("Day 1: Hi there"));
    }
}
