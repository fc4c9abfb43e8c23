//! Interaction state machine.
//!
//! Drives one session from its opening question to a complete set of
//! answers, surfacing exactly one question (or one form) per turn:
//!
//! ```text
//!   Init ──> AwaitingCoreInput ──> AwaitingQueuedAnswer ──> Complete
//!                   │                    ^      │
//!                   │  generate (once)   │      │ pop one per turn
//!                   └────────────────────┘      └──────┐
//!                                                      v
//! ```
//!
//! Follow-up questions are generated when the core answers are present and
//! the session has no queue yet. Queue absence is the only trigger, so the
//! generator runs at most once per session no matter how often a turn is
//! replayed. Generator failures never strand a session: they install a fixed
//! fallback queue instead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tandem_agent::{MAX_SALES_QUESTIONS, QuestionGenerator, with_timeout};
use tandem_store::{AnswerBatch, Pipeline, Question, Session};
use tracing::{debug, info, warn};

use crate::poster::{POSTER_PROMPT_SKELETON, render_answer};
use crate::questions::{self, CONVERSATION, MAIN_IDEA, OPERATION};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where a session stands in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    /// Nothing asked or answered yet.
    Init,
    /// The pipeline still needs its foundational answer(s).
    AwaitingCoreInput,
    /// Working through the generated follow-up questions.
    AwaitingQueuedAnswer,
    /// All answers collected; ready for dispatch.
    Complete,
}

impl InteractionState {
    /// Classify a stored session.
    pub fn of(session: &Session) -> Self {
        if session.pipeline == Pipeline::Orchestrator {
            return Self::Complete;
        }
        if !core_input_present(session) {
            return if session.collected_answers.is_empty() && !session.awaiting_input() {
                Self::Init
            } else {
                Self::AwaitingCoreInput
            };
        }
        match &session.question_queue {
            Some(queue) if queue.is_empty() && !session.awaiting_input() => Self::Complete,
            _ => Self::AwaitingQueuedAnswer,
        }
    }
}

/// Result of one [`InteractionMachine::advance`] turn.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Show these questions (always exactly one) and wait for answers.
    NeedsInput(Vec<Question>),
    /// Every answer is in.
    Done(AnswerBatch),
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

/// Advances sessions one turn at a time.
#[derive(Clone)]
pub struct InteractionMachine {
    questions: Arc<dyn QuestionGenerator>,
    generator_timeout: Duration,
}

impl InteractionMachine {
    pub fn new(questions: Arc<dyn QuestionGenerator>, generator_timeout: Duration) -> Self {
        Self {
            questions,
            generator_timeout,
        }
    }

    /// Merge `batch` into `session` and decide what to ask next.
    ///
    /// Never fails: collaborator errors degrade to fallback questions. On a
    /// complete session this is a no-op that re-returns [`Outcome::Done`].
    pub async fn advance(&self, mut session: Session, batch: AnswerBatch) -> (Session, Outcome) {
        if batch.is_empty() {
            // Replaying a turn without answers re-surfaces the pending question.
            if session.awaiting_input() {
                let pending = session.pending_questions.clone();
                return (session, Outcome::NeedsInput(pending));
            }
        } else {
            self.merge(&mut session, batch);
        }

        let outcome = match session.pipeline {
            Pipeline::Orchestrator => Outcome::Done(session.collected_answers.clone()),
            Pipeline::Sales => self.advance_sales(&mut session).await,
            Pipeline::Poster => self.advance_poster(&mut session).await,
        };

        session.touch();
        (session, outcome)
    }

    fn merge(&self, session: &mut Session, batch: AnswerBatch) {
        if !session.awaiting_input() {
            warn!(
                pipeline = %session.pipeline,
                keys = ?batch.keys().collect::<Vec<_>>(),
                "answers submitted while no question was pending"
            );
        }

        let report = session.merge_answers(batch);
        if !report.unexpected.is_empty() && session.awaiting_input() {
            warn!(
                pipeline = %session.pipeline,
                unexpected = ?report.unexpected,
                "answer batch carries keys no pending question asked for"
            );
        }
        if !report.overwritten.is_empty() {
            debug!(overwritten = ?report.overwritten, "answers overwritten");
        }

        session.pending_questions.clear();
    }

    async fn advance_sales(&self, session: &mut Session) -> Outcome {
        if !core_input_present(session) {
            return ask(session, questions::sales_initial_input());
        }

        if session.question_queue.is_none() {
            let generated = with_timeout(
                "question_generator",
                self.generator_timeout,
                self.questions.sales_questions(&session.collected_answers),
            )
            .await;

            let queue = match generated {
                Ok(mut queue) => {
                    if queue.len() > MAX_SALES_QUESTIONS {
                        debug!(generated = queue.len(), "dropping surplus sales questions");
                        queue.truncate(MAX_SALES_QUESTIONS);
                    }
                    queue
                }
                Err(e) => {
                    warn!(error = %e, "sales question generation failed, using fallback questions");
                    questions::sales_fallback()
                }
            };
            info!(count = queue.len(), "sales follow-up questions queued");
            session.install_queue(queue);
        }

        next_or_done(session)
    }

    async fn advance_poster(&self, session: &mut Session) -> Outcome {
        if !core_input_present(session) {
            return ask(session, questions::poster_main_idea());
        }

        if session.question_queue.is_none() {
            let main_idea = session
                .collected_answers
                .get(MAIN_IDEA)
                .and_then(render_answer)
                .unwrap_or_default();

            let generated = with_timeout(
                "question_generator",
                self.generator_timeout,
                self.questions.poster_questions(&main_idea, POSTER_PROMPT_SKELETON),
            )
            .await;

            let queue = generated.unwrap_or_else(|e| {
                warn!(error = %e, "poster question generation failed, using placeholder question");
                questions::poster_fallback()
            });
            info!(count = queue.len(), main_idea = %main_idea, "poster follow-up questions queued");
            session.install_queue(queue);
        }

        next_or_done(session)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn core_input_present(session: &Session) -> bool {
    match session.pipeline {
        Pipeline::Sales => session.has_answer(CONVERSATION) && session.has_answer(OPERATION),
        Pipeline::Poster => session.has_answer(MAIN_IDEA),
        Pipeline::Orchestrator => true,
    }
}

fn ask(session: &mut Session, question: Question) -> Outcome {
    debug!(question = %question.id, "asking question");
    session.pending_questions = vec![question];
    Outcome::NeedsInput(session.pending_questions.clone())
}

fn next_or_done(session: &mut Session) -> Outcome {
    match session.pop_question() {
        Some(question) => ask(session, question),
        None => {
            debug!(pipeline = %session.pipeline, "interaction complete");
            Outcome::Done(session.collected_answers.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tandem_agent::AgentError;

    use super::*;

    /// Counts calls and returns a fixed list, or fails when `fail` is set.
    struct MockGenerator {
        calls: AtomicU32,
        questions: Vec<Question>,
        fail: bool,
        delay: Duration,
    }

    impl MockGenerator {
        fn returning(questions: Vec<Question>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                questions,
                fail: false,
                delay: Duration::ZERO,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                questions: Vec::new(),
                fail: true,
                delay: Duration::ZERO,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        async fn respond(&self) -> tandem_agent::Result<Vec<Question>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err(AgentError::LlmRequestFailed {
                    reason: "503".into(),
                })
            } else {
                Ok(self.questions.clone())
            }
        }
    }

    #[async_trait]
    impl QuestionGenerator for MockGenerator {
        async fn sales_questions(
            &self,
            _collected: &AnswerBatch,
        ) -> tandem_agent::Result<Vec<Question>> {
            self.respond().await
        }

        async fn poster_questions(
            &self,
            _main_idea: &str,
            _skeleton: &str,
        ) -> tandem_agent::Result<Vec<Question>> {
            self.respond().await
        }
    }

    fn machine(generator: Arc<MockGenerator>) -> InteractionMachine {
        InteractionMachine::new(generator, Duration::from_secs(5))
    }

    fn batch(v: Value) -> AnswerBatch {
        v.as_object().cloned().unwrap_or_default()
    }

    fn asked(outcome: &Outcome) -> Vec<&str> {
        match outcome {
            Outcome::NeedsInput(qs) => qs.iter().map(|q| q.id.as_str()).collect(),
            Outcome::Done(_) => Vec::new(),
        }
    }

    fn follow_ups(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question::free_text(format!("clarification_{i}"), format!("Q{i}")))
            .collect()
    }

    #[tokio::test]
    async fn poster_asks_main_idea_first() {
        let generator = MockGenerator::returning(follow_ups(2));
        let m = machine(Arc::clone(&generator));

        let session = Session::new(Pipeline::Poster);
        assert_eq!(InteractionState::of(&session), InteractionState::Init);

        let (session, outcome) = m.advance(session, AnswerBatch::new()).await;
        assert_eq!(asked(&outcome), vec![MAIN_IDEA]);
        assert_eq!(InteractionState::of(&session), InteractionState::AwaitingCoreInput);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn sales_opens_with_combined_form() {
        let m = machine(MockGenerator::returning(follow_ups(3)));
        let (session, outcome) = m.advance(Session::new(Pipeline::Sales), AnswerBatch::new()).await;

        assert_eq!(asked(&outcome), vec![questions::SALES_INITIAL_INPUT]);
        assert_eq!(session.pending_questions[0].answer_keys(), vec![CONVERSATION, OPERATION]);
    }

    #[tokio::test]
    async fn partial_sales_form_is_asked_again() {
        let generator = MockGenerator::returning(follow_ups(3));
        let m = machine(Arc::clone(&generator));
        let (session, _) = m.advance(Session::new(Pipeline::Sales), AnswerBatch::new()).await;

        let (session, outcome) = m
            .advance(session, batch(json!({ "conversation": "Day 1: hi" })))
            .await;
        assert_eq!(asked(&outcome), vec![questions::SALES_INITIAL_INPUT]);
        assert!(session.has_answer(CONVERSATION));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn one_question_per_turn_and_generation_once() {
        let generator = MockGenerator::returning(follow_ups(3));
        let m = machine(Arc::clone(&generator));
        let (mut session, _) = m.advance(Session::new(Pipeline::Sales), AnswerBatch::new()).await;

        let mut answers = batch(json!({ "conversation": "Day 1: hi", "operation": "Intent Analysis" }));
        let mut seen = Vec::new();
        loop {
            let (next, outcome) = m.advance(session, answers).await;
            session = next;
            match outcome {
                Outcome::NeedsInput(qs) => {
                    assert_eq!(qs.len(), 1);
                    seen.push(qs[0].id.clone());
                    answers = AnswerBatch::new();
                    answers.insert(qs[0].id.clone(), json!("B"));
                }
                Outcome::Done(collected) => {
                    assert_eq!(collected.len(), 5);
                    break;
                }
            }
        }

        assert_eq!(seen, vec!["clarification_1", "clarification_2", "clarification_3"]);
        assert_eq!(generator.calls(), 1);
        assert_eq!(InteractionState::of(&session), InteractionState::Complete);
    }

    #[tokio::test]
    async fn complete_session_is_idempotent() {
        let generator = MockGenerator::returning(Vec::new());
        let m = machine(Arc::clone(&generator));

        let (session, outcome) = m
            .advance(Session::new(Pipeline::Poster), batch(json!({ "main_idea": "EdTech" })))
            .await;
        let Outcome::Done(first) = outcome else {
            panic!("empty generation should complete immediately");
        };

        let (session, outcome) = m.advance(session, AnswerBatch::new()).await;
        assert_eq!(outcome, Outcome::Done(first.clone()));
        let (_, outcome) = m.advance(session, AnswerBatch::new()).await;
        assert_eq!(outcome, Outcome::Done(first));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn sales_generator_failure_uses_fallback_questions() {
        let m = machine(MockGenerator::failing());
        let (session, _) = m.advance(Session::new(Pipeline::Sales), AnswerBatch::new()).await;

        let (session, outcome) = m
            .advance(
                session,
                batch(json!({ "conversation": "Day 1: hi", "operation": "Next Best Action" })),
            )
            .await;
        assert_eq!(asked(&outcome), vec!["fallback_1"]);
        assert_eq!(session.queued(), 1);
    }

    #[tokio::test]
    async fn poster_generator_failure_uses_placeholder() {
        let m = machine(MockGenerator::failing());
        let (_, outcome) = m
            .advance(Session::new(Pipeline::Poster), batch(json!({ "main_idea": "Bootcamp" })))
            .await;
        assert_eq!(asked(&outcome), vec!["fallback"]);
    }

    #[tokio::test]
    async fn generator_timeout_degrades_to_fallback() {
        let generator = Arc::new(MockGenerator {
            calls: AtomicU32::new(0),
            questions: follow_ups(2),
            fail: false,
            delay: Duration::from_secs(5),
        });
        let m = InteractionMachine::new(generator, Duration::from_millis(20));

        let (_, outcome) = m
            .advance(Session::new(Pipeline::Poster), batch(json!({ "main_idea": "Bootcamp" })))
            .await;
        assert_eq!(asked(&outcome), vec!["fallback"]);
    }

    #[tokio::test]
    async fn empty_batch_resurfaces_pending_question() {
        let generator = MockGenerator::returning(follow_ups(2));
        let m = machine(Arc::clone(&generator));
        let (session, _) = m
            .advance(Session::new(Pipeline::Poster), batch(json!({ "main_idea": "Bootcamp" })))
            .await;
        assert_eq!(session.queued(), 1);

        let (session, outcome) = m.advance(session, AnswerBatch::new()).await;
        assert_eq!(asked(&outcome), vec!["clarification_1"]);
        assert_eq!(session.queued(), 1);
    }

    #[tokio::test]
    async fn extraneous_keys_are_merged_anyway() {
        let m = machine(MockGenerator::returning(follow_ups(1)));
        let (session, _) = m.advance(Session::new(Pipeline::Poster), AnswerBatch::new()).await;

        let (session, outcome) = m
            .advance(session, batch(json!({ "main_idea": "Bootcamp", "color": "red" })))
            .await;
        assert_eq!(asked(&outcome), vec!["clarification_1"]);
        assert_eq!(session.answer_str("color"), Some("red"));
    }

    #[tokio::test]
    async fn orchestrator_is_done_immediately() {
        let generator = MockGenerator::returning(follow_ups(1));
        let m = machine(Arc::clone(&generator));
        let (_, outcome) = m
            .advance(Session::new(Pipeline::Orchestrator), AnswerBatch::new())
            .await;
        assert_eq!(outcome, Outcome::Done(AnswerBatch::new()));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn sales_queue_is_capped() {
        let generator = MockGenerator::returning(follow_ups(5));
        let m = machine(Arc::clone(&generator));

        let (session, outcome) = m
            .advance(
                Session::new(Pipeline::Sales),
                batch(json!({ "conversation": "Day 1: hi", "operation": "Intent Analysis" })),
            )
            .await;
        assert_eq!(asked(&outcome), vec!["clarification_1"]);
        assert_eq!(session.queued(), MAX_SALES_QUESTIONS - 1);
    }

    /// Records the main idea each poster call receives.
    #[derive(Default)]
    struct IdeaRecorder(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl QuestionGenerator for IdeaRecorder {
        async fn sales_questions(&self, _: &AnswerBatch) -> tandem_agent::Result<Vec<Question>> {
            Ok(Vec::new())
        }

        async fn poster_questions(
            &self,
            main_idea: &str,
            _skeleton: &str,
        ) -> tandem_agent::Result<Vec<Question>> {
            self.0.lock().unwrap().push(main_idea.to_owned());
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn unusable_main_idea_is_sent_as_empty_text() {
        let recorder = Arc::new(IdeaRecorder::default());
        let m = InteractionMachine::new(recorder.clone(), Duration::from_secs(5));

        for main_idea in [json!(null), json!({ "topic": "x" }), json!("  Summer sale ")] {
            let mut answers = AnswerBatch::new();
            answers.insert(MAIN_IDEA.into(), main_idea);
            m.advance(Session::new(Pipeline::Poster), answers).await;
        }

        assert_eq!(*recorder.0.lock().unwrap(), vec!["", "", "Summer sale"]);
    }
}
