//! LLM-backed question generation.

use async_trait::async_trait;
use serde_json::Value;
use tandem_store::{AnswerBatch, Question};

use crate::collaborator::QuestionGenerator;
use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LlmClient};

/// Upper bound on clarifying questions for a sales conversation.
pub const MAX_SALES_QUESTIONS: usize = 3;

const SALES_TEMPERATURE: f32 = 0.5;
const POSTER_TEMPERATURE: f32 = 0.4;

/// Generates follow-up questions through an OpenAI-compatible chat model in
/// JSON mode.
#[derive(Debug, Clone)]
pub struct LlmQuestionGenerator {
    client: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn sales_questions(&self, collected: &AnswerBatch) -> Result<Vec<Question>> {
        let conversation = collected
            .get("conversation")
            .and_then(Value::as_str)
            .unwrap_or("No conversation provided.");
        let operation = collected
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("Intent Analysis");

        let prompt = sales_prompt(conversation, operation);
        let reply = self
            .client
            .chat_json(&ChatRequest::json("", prompt, SALES_TEMPERATURE))
            .await?;

        let mut questions = parse_questions(&reply)?;
        questions.truncate(MAX_SALES_QUESTIONS);
        tracing::info!(count = questions.len(), "generated sales questions");
        Ok(questions)
    }

    async fn poster_questions(&self, main_idea: &str, skeleton: &str) -> Result<Vec<Question>> {
        let prompt = poster_prompt(main_idea, skeleton);
        let reply = self
            .client
            .chat_json(&ChatRequest::json("", prompt, POSTER_TEMPERATURE))
            .await?;

        let questions = parse_questions(&reply)?;
        tracing::info!(count = questions.len(), main_idea, "generated poster questions");
        Ok(questions)
    }
}

/// Read the `questions` array out of a generator reply.
///
/// Entries that do not deserialize into a [`Question`] are dropped with a
/// warning; a non-empty array with no usable entry is an error.
pub fn parse_questions(reply: &Value) -> Result<Vec<Question>> {
    let raw = reply["questions"]
        .as_array()
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "reply has no `questions` array".into(),
        })?;

    let mut questions = Vec::with_capacity(raw.len());
    for entry in raw {
        match serde_json::from_value::<Question>(entry.clone()) {
            Ok(q) => questions.push(q),
            Err(e) => tracing::warn!(error = %e, "dropping malformed generated question"),
        }
    }

    if questions.is_empty() && !raw.is_empty() {
        return Err(AgentError::LlmParseFailed {
            reason: "no generated question could be parsed".into(),
        });
    }
    Ok(questions)
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

fn sales_prompt(conversation: &str, operation: &str) -> String {
    format!(
        r#"You are a Sales Intelligence Question Generator. Analyze the sales conversation below and generate 3 highly specific, context-driven questions that extract the critical information still missing for the selected operation.

OPERATION: {operation}
SALES CONVERSATION:
---
{conversation}
---

INSTRUCTIONS:
1. Identify the biggest information gaps that prevent a clear analysis for the selected operation: inconsistencies, unanswered threads, missing context, behavioral shifts.
2. Generate exactly 3 questions tied directly to details of the conversation.
3. Give each question clear multiple-choice answers (A, B, C, D).
4. Return ONLY a JSON object with a single key "questions", a list of objects shaped like:
   {{"id": "clarification_1", "text": "...", "ui_element": "radio", "options": ["A) ...", "B) ...", "C) ...", "D) ..."]}}
"#
    )
}

fn poster_prompt(main_idea: &str, skeleton: &str) -> String {
    format!(
        r#"You are an expert UI/UX designer and prompt engineer. Turn the user's core idea into a minimal, intuitive set of questions for building a poster.

USER'S CORE IDEA: "{main_idea}"

TASKS:
1. Keep every generated option relevant to the core idea.
2. Group related items: ask for the visual style first, then present all text choices in a single form step. Use 3-4 steps at most.
3. For text fields such as "heading" or "subheading", offer 3 creative variations tied to the core idea.
4. Return a JSON object with a "questions" key. Each question has "id", "text", "ui_element" (radio, multiselect, text or form) and either "options" or, for forms, "fields" (each with "id", "label", "type", "options").
   Field and question ids must match the placeholders of the skeleton below (visual_style, heading, subheading, effects, ...).

PROMPT SKELETON TO REFERENCE:
---
{skeleton}
---
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tandem_store::UiHint;

    #[test]
    fn parses_grouped_poster_questions() {
        let reply = json!({
            "questions": [
                { "id": "visual_style", "text": "Choose a style", "ui_element": "radio",
                  "options": ["Cinematic", "Minimalist"] },
                { "id": "text_content", "text": "Pick the copy", "ui_element": "form",
                  "fields": [
                      { "id": "heading", "label": "Main Heading", "type": "radio", "options": ["A", "B"] },
                      { "id": "subheading", "label": "Subheading", "type": "text" }
                  ] }
            ]
        });

        let questions = parse_questions(&reply).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].ui_hint, UiHint::SingleChoice);
        assert_eq!(questions[1].ui_hint, UiHint::Form);
        assert_eq!(questions[1].answer_keys(), vec!["heading", "subheading"]);
    }

    #[test]
    fn missing_questions_key_is_a_parse_error() {
        let err = parse_questions(&json!({ "items": [] })).unwrap_err();
        assert!(matches!(err, AgentError::LlmParseFailed { .. }));
    }

    #[test]
    fn empty_questions_list_is_valid() {
        assert!(parse_questions(&json!({ "questions": [] })).unwrap().is_empty());
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let reply = json!({
            "questions": [
                { "text": "no id here" },
                { "id": "q1", "text": "fine" }
            ]
        });
        let questions = parse_questions(&reply).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q1");

        let err = parse_questions(&json!({ "questions": [{ "oops": 1 }] })).unwrap_err();
        assert!(matches!(err, AgentError::LlmParseFailed { .. }));
    }

    #[test]
    fn prompts_embed_their_inputs() {
        let p = sales_prompt("Day 1: hello", "Next Best Action");
        assert!(p.contains("Day 1: hello"));
        assert!(p.contains("OPERATION: Next Best Action"));

        let p = poster_prompt("EdTech poster", "Envision a {visual_style}");
        assert!(p.contains("\"EdTech poster\""));
        assert!(p.contains("Envision a {visual_style}"));
    }
}
