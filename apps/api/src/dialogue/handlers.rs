//! Axum route handlers for the Dialogue API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialogue::controller::StepOutcome;
use crate::dialogue::session::SessionSnapshot;
use crate::errors::AppError;
use crate::render::artifacts::ArtifactOwner;
use crate::render::TemplateVariant;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub variant: String,
    /// A session this one replaces. It is cancelled and dropped along with its artifact.
    pub supersedes: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    /// Set once the analysis has rendered the session's resume.
    pub artifact_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub step: StepOutcome,
    pub session: SessionResponse,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let variant = request
        .variant
        .parse::<TemplateVariant>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let session = state.sessions.start(variant, request.supersedes).await;

    let snapshot = session.snapshot().await;
    Ok((StatusCode::CREATED, Json(session_response(&state, snapshot).await)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let snapshot = session.snapshot().await;
    Ok(Json(session_response(&state, snapshot).await))
}

/// POST /api/v1/sessions/:id/messages
///
/// Input the current stage does not accept comes back as `ignored` rather than an error.
pub async fn handle_post_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let step = state
        .sessions
        .submit(session_id, &request.text)
        .await
        .ok_or_else(|| session_not_found(session_id))?;

    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    let snapshot = session.snapshot().await;

    Ok(Json(MessageResponse {
        step,
        session: session_response(&state, snapshot).await,
    }))
}

/// DELETE /api/v1/sessions/:id
///
/// Cancels any pending analysis, forgets the session and releases its artifact.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .sessions
        .remove(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(Json(snapshot))
}

async fn session_response(state: &AppState, snapshot: SessionSnapshot) -> SessionResponse {
    let artifact_id = state
        .artifacts
        .current_for(&ArtifactOwner::Session(snapshot.id))
        .await;
    SessionResponse {
        session: snapshot,
        artifact_id,
    }
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
