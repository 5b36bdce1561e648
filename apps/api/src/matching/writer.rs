//! Referral Writer: one referral row per (requisition, candidate), written once.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::matching::scorer::{clean_skills, MatchScore};
use crate::models::referral::NewReferral;
use crate::store::{InsertOutcome, RecruitingStore, StoreError};

#[derive(Clone)]
pub struct ReferralWriter {
    store: Arc<dyn RecruitingStore>,
}

impl ReferralWriter {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }

    /// Persists a scored match as a `PENDING_REVIEW` referral.
    ///
    /// A duplicate pair or a requisition that is gone or closed is not an
    /// error; the outcome says which.
    pub async fn save(
        &self,
        requisition_id: Uuid,
        candidate_id: Uuid,
        score: &MatchScore,
    ) -> Result<InsertOutcome, StoreError> {
        let new = NewReferral {
            requisition_id,
            candidate_id,
            match_score: score.score,
            justification: score.justification.clone(),
            matching_skills: clean_skills(score.matching_skills.clone()),
        };

        let outcome = self.store.insert_referral(new).await?;
        match &outcome {
            InsertOutcome::Created(referral) => info!(
                "Referral {} created for requisition {} / candidate {} (score {})",
                referral.id, requisition_id, candidate_id, referral.match_score
            ),
            InsertOutcome::Duplicate => debug!(
                "Referral for requisition {requisition_id} / candidate {candidate_id} already exists"
            ),
            InsertOutcome::RequisitionUnavailable => info!(
                "Requisition {requisition_id} is gone or closed; dropping score for candidate {candidate_id}"
            ),
        }
        Ok(outcome)
    }
}
