use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::IngestRequest;
use crate::models::requisition::{Requisition, RequisitionStatus};
use crate::routes::upload::read_form;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ManagerQuery {
    pub manager_id: Uuid,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: RequisitionStatus,
}

#[derive(Serialize)]
pub struct RematchResponse {
    pub requisition_id: Uuid,
    pub message: &'static str,
}

/// POST /api/v1/requisitions
/// Multipart fields: `title`, `client_name` (optional), `manager_id`, `file`.
pub async fn handle_create_requisition(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Requisition>), AppError> {
    let mut form = read_form(multipart).await?;
    let manager_id = Uuid::parse_str(form.require_field("manager_id")?)
        .map_err(|_| AppError::Validation("manager_id must be a UUID".to_string()))?;
    let title = form.require_field("title")?.to_string();
    let client_name = form.field("client_name").map(str::to_string);
    let file = form.take_file()?;

    let requisition = state
        .ingestor
        .ingest(IngestRequest {
            title,
            client_name,
            manager_id,
            file_name: file.file_name,
            bytes: file.bytes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(requisition)))
}

/// GET /api/v1/requisitions?manager_id=
pub async fn handle_list_requisitions(
    State(state): State<AppState>,
    Query(params): Query<ManagerQuery>,
) -> Result<Json<Vec<Requisition>>, AppError> {
    Ok(Json(state.store.requisitions_for_manager(params.manager_id).await?))
}

/// PATCH /api/v1/requisitions/:id/status
pub async fn handle_update_requisition_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Requisition>, AppError> {
    let updated = state
        .store
        .set_requisition_status(id, req.status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("requisition {id} not found")))?;
    tracing::info!("Requisition {id} set to {}", updated.status.as_str());
    Ok(Json(updated))
}

/// POST /api/v1/requisitions/:id/rematch
pub async fn handle_rematch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RematchResponse>), AppError> {
    state.ingestor.rematch(id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(RematchResponse {
            requisition_id: id,
            message: "Matching scheduled.",
        }),
    ))
}
