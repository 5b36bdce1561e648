use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::candidate::{Candidate, CandidateUpdate, EngagedCandidate, NewCandidate};
use crate::routes::upload::read_form;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ResumeUploadResponse {
    pub candidate_id: Uuid,
    pub resume_path: String,
    pub message: &'static str,
}

/// POST /api/v1/candidates
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Json(req): Json<NewCandidate>,
) -> Result<(StatusCode, Json<Candidate>), AppError> {
    let created = state.candidates.create(req).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, AppError> {
    Ok(Json(state.candidates.get(id).await?))
}

/// PUT /api/v1/candidates/:id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<CandidateUpdate>,
) -> Result<Json<Candidate>, AppError> {
    Ok(Json(state.candidates.update(id, update).await?))
}

/// POST /api/v1/candidates/:id/resume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeUploadResponse>), AppError> {
    let mut form = read_form(multipart).await?;
    let file = form.take_file()?;
    let resume_path = state
        .candidates
        .upload_resume(id, &file.file_name, file.bytes)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResumeUploadResponse {
            candidate_id: id,
            resume_path,
            message: "Resume uploaded. Skills are being extracted in the background.",
        }),
    ))
}

/// GET /api/v1/candidates/engaged
pub async fn handle_engaged_candidates(
    State(state): State<AppState>,
) -> Result<Json<Vec<EngagedCandidate>>, AppError> {
    Ok(Json(state.candidates.engaged().await?))
}
