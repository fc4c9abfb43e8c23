//! Workflow engine.
//!
//! The facade callers use: [`WorkflowEngine::start_session`] opens a session
//! for a service and [`WorkflowEngine::resume_session`] feeds it answers.
//! Each turn runs under the session's lock and follows the same sequence:
//!
//! 1. load the session (or create it on start),
//! 2. advance the interaction state machine,
//! 3. persist,
//! 4. on completion, dispatch and archive the terminal result.
//!
//! A dispatch failure leaves the session persisted as complete but
//! undelivered, so the next resume retries only the dispatch.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_agent::Collaborators;
use tandem_store::{AnswerBatch, CheckpointStore, Pipeline, Question, Session, SessionLocks};
use tracing::{debug, info, instrument, warn};

use crate::dispatcher::{DispatchConfig, Dispatcher, TerminalResult};
use crate::error::Result;
use crate::interaction::{InteractionMachine, Outcome};
use crate::router::IntentRouter;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// How a session collects its answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Ask one question per turn until the pipeline has what it needs.
    #[default]
    Interactive,
    /// Answers are supplied up front; dispatch immediately.
    Autonomous,
}

/// What a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// The session is paused on these questions.
    RequiresInput {
        token: String,
        questions: Vec<Question>,
    },
    /// The pipeline finished.
    Completed {
        token: String,
        result: TerminalResult,
    },
}

impl Turn {
    pub fn token(&self) -> &str {
        match self {
            Self::RequiresInput { token, .. } | Self::Completed { token, .. } => token,
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Deadline for a question-generation call.
    pub generator_timeout: Duration,
    pub dispatch: DispatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generator_timeout: Duration::from_secs(60),
            dispatch: DispatchConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Routes requests, runs the interaction loop, and dispatches completed
/// sessions.
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn CheckpointStore>,
    locks: SessionLocks,
    router: IntentRouter,
    machine: InteractionMachine,
    dispatcher: Dispatcher,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        collaborators: Collaborators,
        router: IntentRouter,
        config: EngineConfig,
    ) -> Result<Self> {
        Ok(Self {
            store,
            locks: SessionLocks::new(),
            router,
            machine: InteractionMachine::new(
                Arc::clone(&collaborators.questions),
                config.generator_timeout,
            ),
            dispatcher: Dispatcher::new(&collaborators, config.dispatch)?,
        })
    }

    /// Open a session for `service`.
    ///
    /// In interactive mode `answers` is usually empty and the first question
    /// comes back. In autonomous mode the answers are merged and the session
    /// is dispatched at once. Services without a pipeline complete
    /// immediately either way.
    #[instrument(skip(self, answers), fields(session))]
    pub async fn start_session(
        &self,
        service: &str,
        mode: ExecutionMode,
        answers: AnswerBatch,
    ) -> Result<Turn> {
        let route = self.router.route(service);
        let token = self.store.create().await?;
        tracing::Span::current().record("session", token.as_str());
        let _guard = self.locks.acquire(&token).await;

        info!(
            session = %token,
            pipeline = %route.pipeline,
            app = %route.app_name,
            mode = ?mode,
            "session started"
        );

        let mut session = Session::new(route.pipeline);

        if route.pipeline == Pipeline::Orchestrator {
            session.merge_answers(answers);
            session.install_queue(Vec::new());
            self.store.save(&token, &session).await?;
            return self.finish(token, session).await;
        }

        match mode {
            ExecutionMode::Interactive => self.turn(token, session, answers).await,
            ExecutionMode::Autonomous => {
                session.merge_answers(answers);
                // A present, empty queue marks generation as done.
                session.install_queue(Vec::new());
                self.store.save(&token, &session).await?;
                self.finish(token, session).await
            }
        }
    }

    /// Feed `answers` to the session behind `token`.
    #[instrument(skip(self, answers), fields(keys = answers.len()))]
    pub async fn resume_session(&self, token: &str, answers: AnswerBatch) -> Result<Turn> {
        let _guard = self.locks.acquire(token).await;
        let session = self.store.load(token).await?;

        if let Some(delivered) = &session.delivered {
            if !answers.is_empty() {
                debug!(session = %token, "ignoring answers for a delivered session");
            }
            let result: TerminalResult = serde_json::from_value(delivered.clone())?;
            return Ok(Turn::Completed {
                token: token.to_owned(),
                result,
            });
        }

        self.turn(token.to_owned(), session, answers).await
    }

    /// The stored session record, for inspection.
    pub async fn session(&self, token: &str) -> Result<Session> {
        Ok(self.store.load(token).await?)
    }

    /// Number of stored sessions.
    pub async fn session_count(&self) -> Result<usize> {
        Ok(self.store.count().await?)
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    /// Drop lock entries for sessions no turn is using.
    pub fn prune_locks(&self) -> usize {
        self.locks.prune_idle()
    }

    /// Lock entries currently held or awaited.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    // -- Turn helpers -------------------------------------------------------

    async fn turn(&self, token: String, session: Session, answers: AnswerBatch) -> Result<Turn> {
        let (session, outcome) = self.machine.advance(session, answers).await;
        self.store.save(&token, &session).await?;

        match outcome {
            Outcome::NeedsInput(questions) => {
                debug!(
                    session = %token,
                    question = %questions.first().map_or("", |q| q.id.as_str()),
                    queued = session.queued(),
                    "awaiting input"
                );
                Ok(Turn::RequiresInput { token, questions })
            }
            Outcome::Done(_) => self.finish(token, session).await,
        }
    }

    /// Dispatch a complete session and archive the result. The caller must
    /// have persisted the complete session already.
    async fn finish(&self, token: String, mut session: Session) -> Result<Turn> {
        let result = match self
            .dispatcher
            .dispatch(session.pipeline, &session.collected_answers)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(session = %token, error = %e, "dispatch failed, session left undelivered");
                return Err(e);
            }
        };

        session.delivered = Some(serde_json::to_value(&result)?);
        session.touch();
        self.store.save(&token, &session).await?;

        info!(session = %token, pipeline = %session.pipeline, "session delivered");
        Ok(Turn::Completed { token, result })
    }
}
