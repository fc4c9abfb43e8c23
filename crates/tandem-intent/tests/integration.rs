//! Integration tests for the tandem-intent crate.
//!
//! These drive [`WorkflowEngine`] end to end with mock collaborators that
//! count their calls, over both checkpoint store backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tandem_agent::{
    AgentError, Collaborators, DayIntent, ImageGenerator, IntentClassifier, QuestionGenerator,
    RetryPolicy, SalesAnalysis, SalesSynthesizer,
};
use tandem_intent::{
    DispatchConfig, EngineConfig, ExecutionMode, IntentError, IntentRouter, PipelineResult, Turn,
    WorkflowEngine,
};
use tandem_store::{
    AnswerBatch, CheckpointStore, Database, FormField, MemoryCheckpointStore, Question,
    SqliteCheckpointStore, UiHint,
};

// ═══════════════════════════════════════════════════════════════════════
//  Mocks
// ═══════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct Counters {
    generator: AtomicU32,
    classifier: AtomicU32,
    synthesizer: AtomicU32,
    images: AtomicU32,
}

impl Counters {
    fn total(&self) -> u32 {
        self.generator.load(Ordering::SeqCst)
            + self.classifier.load(Ordering::SeqCst)
            + self.synthesizer.load(Ordering::SeqCst)
            + self.images.load(Ordering::SeqCst)
    }
}

struct MockQuestions(Arc<Counters>);

#[async_trait]
impl QuestionGenerator for MockQuestions {
    async fn sales_questions(&self, collected: &AnswerBatch) -> tandem_agent::Result<Vec<Question>> {
        self.0.generator.fetch_add(1, Ordering::SeqCst);
        assert!(collected.contains_key("conversation"));
        Ok((1..=3)
            .map(|i| Question {
                id: format!("clarification_{i}"),
                prompt_text: format!("Clarify point {i}"),
                ui_hint: UiHint::SingleChoice,
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                fields: Vec::new(),
            })
            .collect())
    }

    async fn poster_questions(
        &self,
        main_idea: &str,
        skeleton: &str,
    ) -> tandem_agent::Result<Vec<Question>> {
        self.0.generator.fetch_add(1, Ordering::SeqCst);
        assert_eq!(main_idea, "EdTech poster");
        assert!(skeleton.contains("{heading}"));
        Ok(vec![
            Question {
                id: "visual_style".into(),
                prompt_text: "Choose a visual style".into(),
                ui_hint: UiHint::SingleChoice,
                options: vec!["Cinematic".into(), "Minimalist".into()],
                fields: Vec::new(),
            },
            Question::form(
                "text_content",
                "Select the copy",
                vec![
                    FormField {
                        id: "heading".into(),
                        label: "Main Heading".into(),
                        kind: UiHint::SingleChoice,
                        options: vec!["Code the Future".into(), "AI For All".into()],
                    },
                    FormField {
                        id: "subheading".into(),
                        label: "Subheading".into(),
                        kind: UiHint::FreeText,
                        options: Vec::new(),
                    },
                ],
            ),
        ])
    }
}

struct MockClassifier(Arc<Counters>);

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, _text: &str) -> tandem_agent::Result<String> {
        self.0.classifier.fetch_add(1, Ordering::SeqCst);
        Ok("Interested".into())
    }
}

struct MockSynthesizer(Arc<Counters>);

#[async_trait]
impl SalesSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _conversation: &str,
        days: &[DayIntent],
    ) -> tandem_agent::Result<SalesAnalysis> {
        self.0.synthesizer.fetch_add(1, Ordering::SeqCst);
        Ok(SalesAnalysis {
            summary: format!("Cycle over {} days ended warm.", days.len()),
            overall_intent: "Ready to Schedule".into(),
            next_best_action: "Book the onboarding call.".into(),
        })
    }
}

/// Fails while `down` is set.
struct MockImages {
    counters: Arc<Counters>,
    down: AtomicBool,
}

#[async_trait]
impl ImageGenerator for MockImages {
    async fn generate(&self, _prompt: &str) -> tandem_agent::Result<Vec<u8>> {
        self.counters.images.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            Err(AgentError::ImageGenerationFailed {
                reason: "provider unavailable".into(),
            })
        } else {
            Ok(b"poster-bytes".to_vec())
        }
    }
}

struct Harness {
    engine: WorkflowEngine,
    counters: Arc<Counters>,
    images: Arc<MockImages>,
}

fn harness(store: Arc<dyn CheckpointStore>) -> Harness {
    let counters = Arc::new(Counters::default());
    let images = Arc::new(MockImages {
        counters: Arc::clone(&counters),
        down: AtomicBool::new(false),
    });
    let collaborators = Collaborators {
        questions: Arc::new(MockQuestions(Arc::clone(&counters))),
        classifier: Arc::new(MockClassifier(Arc::clone(&counters))),
        synthesizer: Arc::new(MockSynthesizer(Arc::clone(&counters))),
        images: images.clone(),
    };
    let config = EngineConfig {
        generator_timeout: Duration::from_secs(5),
        dispatch: DispatchConfig {
            classifier: RetryPolicy {
                attempts: 3,
                backoff: Duration::ZERO,
                timeout: Duration::from_secs(5),
            },
            collaborator_timeout: Duration::from_secs(5),
        },
    };
    let engine =
        WorkflowEngine::new(store, collaborators, IntentRouter::default(), config).unwrap();
    Harness {
        engine,
        counters,
        images,
    }
}

fn memory_harness() -> Harness {
    harness(Arc::new(MemoryCheckpointStore::new()))
}

fn answers(v: Value) -> AnswerBatch {
    v.as_object().cloned().unwrap_or_default()
}

fn expect_questions(turn: &Turn) -> Vec<&str> {
    match turn {
        Turn::RequiresInput { questions, .. } => {
            assert_eq!(questions.len(), 1, "exactly one question per turn");
            questions.iter().map(|q| q.id.as_str()).collect()
        }
        Turn::Completed { .. } => panic!("expected questions, got a terminal result"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Scenarios
// ═══════════════════════════════════════════════════════════════════════

async fn poster_happy_path(h: &Harness) {
    let e = &h.engine;

    let turn = e
        .start_session("poster", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    assert_eq!(expect_questions(&turn), vec!["main_idea"]);
    let token = turn.token().to_owned();

    let turn = e
        .resume_session(&token, answers(json!({ "main_idea": "EdTech poster" })))
        .await
        .unwrap();
    assert_eq!(expect_questions(&turn), vec!["visual_style"]);

    let turn = e
        .resume_session(&token, answers(json!({ "visual_style": "Minimalist" })))
        .await
        .unwrap();
    assert_eq!(expect_questions(&turn), vec!["text_content"]);

    let turn = e
        .resume_session(
            &token,
            answers(json!({ "heading": "Code the Future", "subheading": "Bootcamp 2025" })),
        )
        .await
        .unwrap();

    let Turn::Completed { result, .. } = turn else {
        panic!("poster should be complete");
    };
    let PipelineResult::Poster {
        image_base64,
        image_prompt,
        ..
    } = result.payload
    else {
        panic!("expected poster result");
    };
    assert!(image_prompt.contains("\"Code the Future\""));
    assert!(image_prompt.starts_with("Envision a Minimalist"));
    assert!(!image_base64.is_empty());
    assert_eq!(h.counters.generator.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.images.load(Ordering::SeqCst), 1);
    assert_eq!(e.lock_count(), 0);
}

#[tokio::test]
async fn scenario_a_poster_memory() {
    poster_happy_path(&memory_harness()).await;
}

#[tokio::test]
async fn scenario_a_poster_sqlite() {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().await.unwrap();
    poster_happy_path(&harness(Arc::new(SqliteCheckpointStore::new(db)))).await;
}

#[tokio::test]
async fn scenario_b_sales() {
    let h = memory_harness();
    let e = &h.engine;

    let turn = e
        .start_session("sales", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    assert_eq!(expect_questions(&turn), vec!["sales_initial_input"]);
    let token = turn.token().to_owned();

    let mut turn = e
        .resume_session(
            &token,
            answers(json!({
                "conversation": "Day 1: Asked for pricing.\nDay 2: Wants a demo next week.",
                "operation": "Next Best Action",
            })),
        )
        .await
        .unwrap();

    for expected in ["clarification_1", "clarification_2", "clarification_3"] {
        assert_eq!(expect_questions(&turn), vec![expected]);
        let mut batch = AnswerBatch::new();
        batch.insert(expected.to_owned(), json!("B"));
        turn = e.resume_session(&token, batch).await.unwrap();
    }

    let Turn::Completed { result, .. } = turn else {
        panic!("sales should be complete");
    };
    let PipelineResult::Sales {
        predicted_intent,
        next_best_action,
        sales_analysis_report,
    } = result.payload
    else {
        panic!("expected sales result");
    };
    assert!(!predicted_intent.is_empty());
    assert!(!next_best_action.is_empty());
    assert!(!sales_analysis_report.summary.is_empty());
    assert_eq!(sales_analysis_report.daily_breakdown.len(), 2);
    assert_eq!(h.counters.generator.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.classifier.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_c_unknown_service() {
    let h = memory_harness();
    let turn = h
        .engine
        .start_session("unknown", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();

    let Turn::Completed { result, .. } = turn else {
        panic!("unknown service must complete immediately");
    };
    assert!(matches!(result.payload, PipelineResult::Orchestrator { .. }));
    assert_eq!(h.counters.total(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
//  Properties
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn lock_entries_do_not_outlive_turns() {
    let h = memory_harness();
    for _ in 0..50 {
        h.engine
            .start_session("unknown", ExecutionMode::Interactive, AnswerBatch::new())
            .await
            .unwrap();
    }
    assert_eq!(h.engine.lock_count(), 0);

    let turn = h
        .engine
        .start_session("poster", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    assert_eq!(expect_questions(&turn), vec!["main_idea"]);
    assert_eq!(h.engine.lock_count(), 0, "a paused session holds no lock");

    h.engine
        .resume_session(turn.token(), answers(json!({ "main_idea": "EdTech poster" })))
        .await
        .unwrap();
    assert_eq!(h.engine.lock_count(), 0);
    assert_eq!(h.engine.prune_locks(), 0);
}

#[tokio::test]
async fn delivered_session_resumes_idempotently() {
    let h = memory_harness();
    let e = &h.engine;

    let turn = e
        .start_session("poster", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    let token = turn.token().to_owned();
    for batch in [
        json!({ "main_idea": "EdTech poster" }),
        json!({ "visual_style": "Cinematic" }),
        json!({ "heading": "AI For All" }),
    ] {
        e.resume_session(&token, answers(batch)).await.unwrap();
    }
    let calls_before = h.counters.total();

    let first = e.resume_session(&token, AnswerBatch::new()).await.unwrap();
    let second = e.resume_session(&token, AnswerBatch::new()).await.unwrap();
    assert!(matches!(first, Turn::Completed { .. }));
    assert_eq!(first, second);
    assert_eq!(h.counters.total(), calls_before);
}

#[tokio::test]
async fn failed_dispatch_is_retried_on_next_resume() {
    let h = memory_harness();
    let e = &h.engine;
    h.images.down.store(true, Ordering::SeqCst);

    let turn = e
        .start_session("poster", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    let token = turn.token().to_owned();
    e.resume_session(&token, answers(json!({ "main_idea": "EdTech poster" })))
        .await
        .unwrap();
    e.resume_session(&token, answers(json!({ "visual_style": "Cinematic" })))
        .await
        .unwrap();

    let err = e
        .resume_session(&token, answers(json!({ "heading": "AI For All" })))
        .await
        .unwrap_err();
    assert!(matches!(err, IntentError::ImageGenerationFailed { .. }));

    let stored = e.session(&token).await.unwrap();
    assert!(!stored.is_delivered());
    assert_eq!(stored.answer_str("heading"), Some("AI For All"));

    h.images.down.store(false, Ordering::SeqCst);
    let turn = e.resume_session(&token, AnswerBatch::new()).await.unwrap();
    assert!(matches!(turn, Turn::Completed { .. }));
    assert!(e.session(&token).await.unwrap().is_delivered());
    assert_eq!(h.counters.generator.load(Ordering::SeqCst), 1);
    assert_eq!(h.counters.images.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_token_is_session_not_found() {
    let h = memory_harness();
    let err = h
        .engine
        .resume_session("no-such-token", AnswerBatch::new())
        .await
        .unwrap_err();
    assert!(matches!(err, IntentError::SessionNotFound { ref token } if token == "no-such-token"));
}

#[tokio::test]
async fn autonomous_mode_dispatches_without_questions() {
    let h = memory_harness();
    let turn = h
        .engine
        .start_session(
            "sales",
            ExecutionMode::Autonomous,
            answers(json!({ "conversation": "Day 1: hello", "operation": "Intent Analysis" })),
        )
        .await
        .unwrap();

    assert!(matches!(turn, Turn::Completed { .. }));
    assert_eq!(h.counters.generator.load(Ordering::SeqCst), 0);
    assert_eq!(h.counters.synthesizer.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_resumes_generate_once() {
    let h = memory_harness();
    let engine = h.engine.clone();

    let turn = engine
        .start_session("poster", ExecutionMode::Interactive, AnswerBatch::new())
        .await
        .unwrap();
    let token = turn.token().to_owned();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            engine
                .resume_session(&token, answers(json!({ "main_idea": "EdTech poster" })))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.counters.generator.load(Ordering::SeqCst), 1);
}
