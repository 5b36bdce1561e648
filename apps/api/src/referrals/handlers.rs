use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::referral::{Referral, ReferralStatus};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub status: ReferralStatus,
}

/// GET /api/v1/requisitions/:id/referrals
/// Recommendations for a requisition, highest score first.
pub async fn handle_list_referrals(
    State(state): State<AppState>,
    Path(requisition_id): Path<Uuid>,
) -> Result<Json<Vec<Referral>>, AppError> {
    if state.store.find_requisition(requisition_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "requisition {requisition_id} not found"
        )));
    }
    Ok(Json(
        state.store.referrals_for_requisition(requisition_id).await?,
    ))
}

/// PATCH /api/v1/referrals/:id/status
pub async fn handle_apply_decision(
    State(state): State<AppState>,
    Path(referral_id): Path<Uuid>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<Referral>, AppError> {
    let updated = state.decisions.apply_decision(referral_id, req.status).await?;
    Ok(Json(updated))
}
