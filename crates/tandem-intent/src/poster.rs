//! Poster prompt template.
//!
//! The same skeleton serves twice: it is handed to the question generator so
//! the generated question ids line up with its placeholders, and it is filled
//! from the collected answers to produce the final image prompt.

use regex::{Captures, Regex};
use serde_json::Value;
use tandem_store::AnswerBatch;

use crate::error::Result;

/// Image prompt skeleton. `{name}` marks a substitution point.
pub const POSTER_PROMPT_SKELETON: &str = r#"Envision a {visual_style} {primary_subject} on a {setting}, with {effects}, all captured in ultra-wide cinematic glory.

Layout:
- Top center: Large bold heading: "{heading}"
- Just below: Smaller subheading: "{subheading}"
- Center area: Short paragraph: "{paragraph}"
- Bottom left: Compact highlight of achievements: "{highlights}"
- Very bottom: Minimal hyperlink: "{hyperlink}"

Critical Instructions:
- Do not include any field labels.
- Text should appear naturally as part of the poster design.
- Avoid overlapping, distortion, and gibberish. Fonts must be clean, {font_style}, and fully legible.
"#;

/// Placeholders and the value used when the answer is missing or blank.
const FIELD_DEFAULTS: &[(&str, &str)] = &[
    ("visual_style", "cinematic"),
    ("primary_subject", "a product"),
    ("setting", "a modern city street"),
    ("effects", "vibrant lighting"),
    ("heading", "Your Title Here"),
    ("subheading", "An engaging subtitle"),
    ("paragraph", "A compelling description of the product or event."),
    ("highlights", "Key Feature 1 | Key Feature 2"),
    ("hyperlink", "yourwebsite.com"),
    ("font_style", "sans-serif"),
];

/// Matches one `{name}` placeholder.
const PLACEHOLDER_PATTERN: &str = r"\{(\w+)\}";

/// Fills [`POSTER_PROMPT_SKELETON`] from collected answers.
#[derive(Debug, Clone)]
pub struct PosterTemplate {
    placeholder: Regex,
}

impl PosterTemplate {
    pub fn new() -> Result<Self> {
        Ok(Self {
            placeholder: Regex::new(PLACEHOLDER_PATTERN)?,
        })
    }

    /// Fill the skeleton from `answers` in a single pass, so answer text is
    /// never itself scanned for placeholders.
    ///
    /// List answers (multi-choice effects) are joined with `", "`.
    pub fn render(&self, answers: &AnswerBatch) -> String {
        self.placeholder
            .replace_all(POSTER_PROMPT_SKELETON, |caps: &Captures<'_>| {
                let field = &caps[1];
                match FIELD_DEFAULTS.iter().find(|(name, _)| *name == field) {
                    Some((_, default)) => answers
                        .get(field)
                        .and_then(render_answer)
                        .unwrap_or_else(|| (*default).to_owned()),
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }
}

/// Render one answer as prompt text; `None` when it carries nothing usable.
pub(crate) fn render_answer(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Array(items) => items
            .iter()
            .filter_map(render_answer)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}
