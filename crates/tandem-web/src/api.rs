//! REST API route handlers.
//!
//! `POST /generate` opens a session, `POST /continue` feeds it answers.
//! Both answer with either `{status: "requires_input", thread_id, questions}`
//! or the pipeline's terminal result plus `thread_id`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tandem_intent::{ExecutionMode, InteractionState, IntentError, Turn};
use tandem_store::AnswerBatch;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An engine error rendered as `{status: "error", kind, message}`.
#[derive(Debug)]
pub struct ApiError(pub IntentError);

impl From<IntentError> for ApiError {
    fn from(err: IntentError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IntentError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            IntentError::ImageGenerationFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        }
        let body = json!({
            "status": "error",
            "kind": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// POST /generate, POST /continue
// ---------------------------------------------------------------------------

/// Request body for `/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// `"poster"`, `"sales"`, an app name, or anything else (orchestrator).
    pub service: String,
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Answers supplied up front (autonomous mode).
    #[serde(default)]
    pub user_answers: AnswerBatch,
}

/// Request body for `/continue`.
#[derive(Debug, Deserialize)]
pub struct ContinueRequest {
    pub thread_id: String,
    #[serde(default)]
    pub user_answers: AnswerBatch,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(service = %req.service, mode = ?req.mode, "generate requested");
    let turn = state
        .engine
        .start_session(&req.service, req.mode, req.user_answers)
        .await?;
    Ok(Json(turn_body(turn)?))
}

pub async fn continue_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContinueRequest>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(thread_id = %req.thread_id, keys = req.user_answers.len(), "continue requested");
    let turn = state
        .engine
        .resume_session(&req.thread_id, req.user_answers)
        .await?;
    Ok(Json(turn_body(turn)?))
}

/// Render a [`Turn`] as the response body.
pub fn turn_body(turn: Turn) -> Result<Value, IntentError> {
    match turn {
        Turn::RequiresInput { token, questions } => Ok(json!({
            "status": "requires_input",
            "thread_id": token,
            "questions": questions,
        })),
        Turn::Completed { token, result } => {
            let mut body = serde_json::to_value(&result)?;
            body["thread_id"] = Value::String(token);
            Ok(body)
        }
    }
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Response payload for the `/api/status` endpoint.
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub sessions: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let sessions = state.engine.session_count().await?;
    Ok(Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        sessions,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/sessions/{id}
// ---------------------------------------------------------------------------

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let session = state.engine.session(&id).await?;
    Ok(Json(json!({
        "thread_id": id,
        "state": InteractionState::of(&session),
        "session": session,
    })))
}
