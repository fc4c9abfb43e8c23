//! Terminal-driven sessions.
//!
//! [`Prompter`] renders each question bundle on a writer and reads the
//! answers from a line reader; [`run_session`] feeds those answers back into
//! the engine until the pipeline produces a result or input runs out.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use serde_json::Value;
use tandem_intent::{ExecutionMode, PipelineResult, TerminalResult, Turn, WorkflowEngine};
use tandem_store::{AnswerBatch, Question, UiHint};

/// A line consisting of this marker opens and closes a multi-line answer.
pub const MULTILINE_MARKER: &str = "\"\"\"";

// ---------------------------------------------------------------------------
// Prompter
// ---------------------------------------------------------------------------

/// Asks questions on `output` and reads answers from `input`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask every question in the bundle.
    ///
    /// Returns `None` when input ends before all answers are in.
    pub fn ask(&mut self, questions: &[Question]) -> io::Result<Option<AnswerBatch>> {
        let mut batch = AnswerBatch::new();

        for question in questions {
            writeln!(self.output)?;
            writeln!(self.output, "  {}", question.prompt_text)?;

            if question.fields.is_empty() {
                let Some(answer) =
                    self.ask_field(None, question.ui_hint, &question.options)?
                else {
                    return Ok(None);
                };
                batch.insert(question.id.clone(), answer);
                continue;
            }

            for field in &question.fields {
                let label = if field.label.is_empty() {
                    field.id.as_str()
                } else {
                    field.label.as_str()
                };
                let Some(answer) = self.ask_field(Some(label), field.kind, &field.options)? else {
                    return Ok(None);
                };
                batch.insert(field.id.clone(), answer);
            }
        }

        Ok(Some(batch))
    }

    fn ask_field(
        &mut self,
        label: Option<&str>,
        hint: UiHint,
        options: &[String],
    ) -> io::Result<Option<Value>> {
        if let Some(label) = label {
            writeln!(self.output, "  {label}:")?;
        }
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "    {}) {option}", i + 1)?;
        }
        match hint {
            UiHint::MultiChoice => writeln!(self.output, "    (comma-separated)")?,
            UiHint::FreeText | UiHint::Form => {
                writeln!(self.output, "    (start and end with {MULTILINE_MARKER} for several lines)")?
            }
            UiHint::SingleChoice => {}
        }
        write!(self.output, "  > ")?;
        self.output.flush()?;

        let Some(raw) = self.read_answer()? else {
            return Ok(None);
        };

        let value = match hint {
            UiHint::MultiChoice => Value::Array(
                parse_multi(&raw, options)
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
            UiHint::SingleChoice => Value::String(parse_choice(&raw, options)),
            UiHint::FreeText | UiHint::Form => Value::String(raw),
        };
        Ok(Some(value))
    }

    /// Read one answer, joining lines between multi-line markers.
    fn read_answer(&mut self) -> io::Result<Option<String>> {
        let Some(first) = self.read_line()? else {
            return Ok(None);
        };
        if first.trim() != MULTILINE_MARKER {
            return Ok(Some(first.trim().to_owned()));
        }

        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            if line.trim() == MULTILINE_MARKER {
                return Ok(Some(lines.join("\n")));
            }
            lines.push(line);
        }
        // Input ended inside the block: keep what was typed.
        Ok(Some(lines.join("\n")))
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_owned()))
    }

    #[cfg(test)]
    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }
}

/// Resolve a single-choice answer: a 1-based option number picks that
/// option, anything else is taken verbatim.
pub fn parse_choice(raw: &str, options: &[String]) -> String {
    let raw = raw.trim();
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .cloned()
        .unwrap_or_else(|| raw.to_owned())
}

/// Resolve a comma-separated multi-choice answer item by item.
pub fn parse_multi(raw: &str, options: &[String]) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_choice(item, options))
        .collect()
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

/// Where a session was started from.
pub enum Start {
    New {
        service: String,
        mode: ExecutionMode,
        answers: AnswerBatch,
    },
    Resume {
        token: String,
        answers: AnswerBatch,
    },
}

/// How a terminal session ended.
#[derive(Debug)]
pub enum ChatEnd {
    /// The pipeline finished.
    Completed {
        token: String,
        result: TerminalResult,
    },
    /// Input ran out while questions were pending.
    Paused { token: String },
}

/// Drive one session to completion or until input ends.
pub async fn run_session<R: BufRead, W: Write>(
    engine: &WorkflowEngine,
    start: Start,
    prompter: &mut Prompter<R, W>,
) -> Result<ChatEnd> {
    let mut turn = match start {
        Start::New {
            service,
            mode,
            answers,
        } => engine.start_session(&service, mode, answers).await?,
        Start::Resume { token, answers } => engine.resume_session(&token, answers).await?,
    };

    loop {
        match turn {
            Turn::RequiresInput { token, questions } => {
                tracing::debug!(session = %token, questions = questions.len(), "awaiting input");
                let Some(batch) = prompter
                    .ask(&questions)
                    .context("failed to read answers")?
                else {
                    return Ok(ChatEnd::Paused { token });
                };
                turn = engine.resume_session(&token, batch).await?;
            }
            Turn::Completed { token, result } => {
                return Ok(ChatEnd::Completed { token, result });
            }
        }
    }
}

/// Pretty JSON for a terminal result with the image payload elided.
pub fn render_result(result: &TerminalResult) -> Result<String> {
    let mut value = serde_json::to_value(result)?;
    if let PipelineResult::Poster { image_base64, .. } = &result.payload {
        value["image_base64"] = Value::String(format!("<{} base64 chars>", image_base64.len()));
    }
    Ok(serde_json::to_string_pretty(&value)?)
}
