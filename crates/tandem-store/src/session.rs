//! Session record persisted between turns.
//!
//! A [`Session`] is the whole state of one interactive dialogue: which
//! pipeline it feeds, the answers collected so far, the queue of questions
//! still to ask, and the question bundle currently shown to the user. It is
//! the only shape the checkpoint stores persist.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A batch of answers keyed by question or form-field id.
pub type AnswerBatch = serde_json::Map<String, Value>;

/// Terminal content-generation flow a session feeds into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Poster image generation.
    Poster,
    /// Sales-conversation analysis.
    Sales,
    /// No pipeline: the request completes immediately with an empty result.
    #[default]
    Orchestrator,
}

impl Pipeline {
    /// Column value used by the SQLite store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poster => "poster",
            Self::Sales => "sales",
            Self::Orchestrator => "orchestrator",
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a question (or form field) should be rendered.
///
/// Generators emit loose UI vocabulary (`radio`, `textarea`, ...); the
/// aliases fold it into four shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiHint {
    #[default]
    #[serde(alias = "text", alias = "textarea", alias = "text_input", alias = "input")]
    FreeText,
    #[serde(alias = "radio", alias = "select", alias = "dropdown")]
    SingleChoice,
    #[serde(alias = "multiselect", alias = "checkbox", alias = "checkboxes")]
    MultiChoice,
    #[serde(alias = "form")]
    Form,
}

/// One input inside a multi-field form question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: UiHint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A question surfaced to the user. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within a session; the answer key on resume (unless the
    /// question is a form, in which case the field ids are the keys).
    pub id: String,
    #[serde(rename = "text", alias = "prompt_text")]
    pub prompt_text: String,
    #[serde(rename = "ui_element", alias = "ui_hint", default)]
    pub ui_hint: UiHint,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FormField>,
}

impl Question {
    /// A free-text question.
    pub fn free_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt_text: text.into(),
            ui_hint: UiHint::FreeText,
            options: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// A multi-field form question.
    pub fn form(id: impl Into<String>, text: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            id: id.into(),
            prompt_text: text.into(),
            ui_hint: UiHint::Form,
            options: Vec::new(),
            fields,
        }
    }

    /// Keys an answer batch is expected to carry for this question.
    pub fn answer_keys(&self) -> Vec<&str> {
        if self.fields.is_empty() {
            vec![self.id.as_str()]
        } else {
            self.fields.iter().map(|f| f.id.as_str()).collect()
        }
    }
}

/// Outcome of merging an [`AnswerBatch`] into a session.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys that were not expected by any pending question.
    pub unexpected: Vec<String>,
    /// Keys that already held a value and were overwritten.
    pub overwritten: Vec<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  Session
// ═══════════════════════════════════════════════════════════════════════

/// Durable record of one in-progress dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub pipeline: Pipeline,

    #[serde(default)]
    pub collected_answers: AnswerBatch,

    /// `None` until the follow-up questions have been generated. Absence is
    /// the only trigger for generation, so it happens at most once.
    #[serde(default)]
    pub question_queue: Option<VecDeque<Question>>,

    /// Questions currently presented to the user (normally at most one).
    #[serde(default)]
    pub pending_questions: Vec<Question>,

    /// Terminal result, set once the pipeline has delivered.
    #[serde(default)]
    pub delivered: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session for `pipeline` with no answers and no queue.
    pub fn new(pipeline: Pipeline) -> Self {
        let now = Utc::now();
        Self {
            pipeline,
            collected_answers: AnswerBatch::new(),
            question_queue: None,
            pending_questions: Vec::new(),
            delivered: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `true` iff a question bundle is currently presented to the user.
    pub fn awaiting_input(&self) -> bool {
        !self.pending_questions.is_empty()
    }

    /// Whether the terminal result has been delivered and archived.
    pub fn is_delivered(&self) -> bool {
        self.delivered.is_some()
    }

    /// Whether an answer for `key` has been collected.
    pub fn has_answer(&self, key: &str) -> bool {
        self.collected_answers.contains_key(key)
    }

    /// A collected answer as a string slice, if it is a JSON string.
    pub fn answer_str(&self, key: &str) -> Option<&str> {
        self.collected_answers.get(key).and_then(Value::as_str)
    }

    /// Merge `batch` into the collected answers, last write wins.
    ///
    /// Keys are not validated against the pending questions; mismatches are
    /// only reported back so the caller can log them.
    pub fn merge_answers(&mut self, batch: AnswerBatch) -> MergeReport {
        let expected: Vec<&str> = self
            .pending_questions
            .iter()
            .flat_map(Question::answer_keys)
            .collect();

        let mut report = MergeReport::default();
        for key in batch.keys() {
            if !expected.contains(&key.as_str()) {
                report.unexpected.push(key.clone());
            }
            if self.collected_answers.contains_key(key) {
                report.overwritten.push(key.clone());
            }
        }

        self.collected_answers.extend(batch);
        report
    }

    /// Install the generated follow-up questions as the queue.
    pub fn install_queue(&mut self, questions: Vec<Question>) {
        self.question_queue = Some(questions.into());
    }

    /// Pop the front of the queue, if any.
    pub fn pop_question(&mut self) -> Option<Question> {
        self.question_queue.as_mut().and_then(VecDeque::pop_front)
    }

    /// Number of questions still queued (0 when no queue exists).
    pub fn queued(&self) -> usize {
        self.question_queue.as_ref().map_or(0, VecDeque::len)
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Pipeline::default())
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
