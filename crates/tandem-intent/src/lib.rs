//! Conversational workflow engine for tandem.
//!
//! This crate provides:
//!
//! - **Routing**: service identifiers resolved to pipelines through an
//!   [`registry::AppRegistry`] via [`router::IntentRouter`].
//! - **Interaction**: the one-question-per-turn state machine in
//!   [`interaction::InteractionMachine`].
//! - **Dispatch**: poster and sales pipelines in
//!   [`dispatcher::Dispatcher`].
//! - **Engine**: the [`workflow::WorkflowEngine`] facade that ties the above
//!   to a checkpoint store with per-session locking.

pub mod dispatcher;
pub mod error;
pub mod interaction;
pub mod poster;
pub mod questions;
pub mod registry;
pub mod router;
pub mod sales;
pub mod workflow;

pub use dispatcher::{
    DispatchConfig, Dispatcher, INTENT_PREDICTION_ERROR, PipelineResult, SalesReport,
    TerminalResult,
};
pub use error::{IntentError, Result};
pub use interaction::{InteractionMachine, InteractionState, Outcome};
pub use poster::{POSTER_PROMPT_SKELETON, PosterTemplate};
pub use registry::{AppEntry, AppRegistry};
pub use router::{IntentRouter, Route};
pub use sales::{DayChunk, DaySplitter};
pub use workflow::{EngineConfig, ExecutionMode, Turn, WorkflowEngine};
