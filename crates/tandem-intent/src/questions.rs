//! Fixed questions: the opening question of each pipeline and the fallbacks
//! used when question generation fails.

use tandem_store::{FormField, Question, UiHint};

/// Id of the sales opening form.
pub const SALES_INITIAL_INPUT: &str = "sales_initial_input";
/// Answer key for the raw sales conversation.
pub const CONVERSATION: &str = "conversation";
/// Answer key for the selected sales operation.
pub const OPERATION: &str = "operation";
/// Answer key and question id for the poster's core idea.
pub const MAIN_IDEA: &str = "main_idea";

/// The combined form that opens a sales session.
pub fn sales_initial_input() -> Question {
    Question::form(
        SALES_INITIAL_INPUT,
        "Please provide the sales conversation and select the primary analysis goal.",
        vec![
            FormField {
                id: CONVERSATION.into(),
                label: "Sales Conversation Text".into(),
                kind: UiHint::FreeText,
                options: Vec::new(),
            },
            FormField {
                id: OPERATION.into(),
                label: "Analysis Goal".into(),
                kind: UiHint::SingleChoice,
                options: vec!["Intent Analysis".into(), "Next Best Action".into()],
            },
        ],
    )
}

/// The single question that opens a poster session.
pub fn poster_main_idea() -> Question {
    Question::free_text(
        MAIN_IDEA,
        "What is the poster about? Be descriptive (e.g., 'An EdTech poster for a Python bootcamp').",
    )
}

/// Generic sales questions used when clarifying-question generation fails.
pub fn sales_fallback() -> Vec<Question> {
    vec![
        Question::free_text("fallback_1", "What is the primary industry of the client?"),
        Question::free_text(
            "fallback_2",
            "Who is the key decision-maker you've been in contact with?",
        ),
    ]
}

/// Placeholder poster question used when skeleton-based generation fails.
pub fn poster_fallback() -> Vec<Question> {
    vec![Question::free_text("fallback", "Error generating questions.")]
}
