//! Axum route handlers for the Render API.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::Profile;
use crate::render::artifacts::ArtifactOwner;
use crate::render::{
    content_disposition, render_profile_blocking, RenderIssue, RenderOutcome, TemplateVariant,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub profile: Profile,
    pub variant: String,
    /// The preview view that owns the artifact. A fresh view id is assigned when absent.
    pub view_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub view_id: String,
    pub artifact_id: Uuid,
    pub outcome: RenderOutcome,
    pub issues: Vec<RenderIssue>,
    pub variant: TemplateVariant,
    pub page_count: usize,
    pub pdf_filename: String,
    pub latex_filename: String,
    pub latex: String,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/render
///
/// Renders the profile and makes the result the view's current artifact, releasing the
/// view's previous one. A failed render leaves the previous artifact in place.
pub async fn handle_render(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, AppError> {
    let variant = request
        .variant
        .parse::<TemplateVariant>()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let view_id = match request.view_id {
        Some(id) if id.trim().is_empty() => {
            return Err(AppError::Validation("viewId cannot be blank".to_string()))
        }
        Some(id) => id.trim().to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let report = render_profile_blocking(request.profile, variant).await;
    let artifact = match (report.outcome, report.artifact) {
        (RenderOutcome::Failed, _) | (_, None) => {
            let reasons: Vec<String> = report.issues.into_iter().map(|i| i.message).collect();
            return Err(AppError::RenderFailed(reasons.join("; ")));
        }
        (_, Some(artifact)) => artifact,
    };

    let page_count = artifact.page_count;
    let pdf_filename = artifact.pdf_filename.clone();
    let latex_filename = artifact.latex_filename.clone();
    let latex = artifact.latex.clone();
    let artifact_id = state
        .artifacts
        .replace(ArtifactOwner::View(view_id.clone()), artifact)
        .await;

    Ok(Json(RenderResponse {
        view_id,
        artifact_id,
        outcome: report.outcome,
        issues: report.issues,
        variant,
        page_count,
        pdf_filename,
        latex_filename,
        latex,
    }))
}

/// GET /api/v1/artifacts/:id/pdf
pub async fn handle_get_pdf(
    State(state): State<AppState>,
    Path(artifact_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let artifact = state
        .artifacts
        .get(artifact_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Artifact {artifact_id} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&artifact.pdf_filename),
            ),
        ],
        artifact.pdf.clone(),
    ))
}

/// GET /api/v1/artifacts/:id/latex
pub async fn handle_get_latex(
    State(state): State<AppState>,
    Path(artifact_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let artifact = state
        .artifacts
        .get(artifact_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Artifact {artifact_id} not found")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-tex; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&artifact.latex_filename),
            ),
        ],
        artifact.latex.clone(),
    ))
}

/// DELETE /api/v1/views/:view_id
///
/// View teardown. Idempotent: releasing a view that holds nothing reports `released: false`.
pub async fn handle_release_view(
    State(state): State<AppState>,
    Path(view_id): Path<String>,
) -> Json<ReleaseResponse> {
    let released = state.artifacts.release(&ArtifactOwner::View(view_id)).await;
    Json(ReleaseResponse { released })
}
