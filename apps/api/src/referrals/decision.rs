//! Referral state machine.
//!
//! ```text
//! PENDING_REVIEW ──► SELECTED   candidate → ON_PROJECT
//!       │        ──► RESERVED   candidate → RESERVED
//!       │        ──► REJECTED   no candidate change
//! RESERVED ──────► REJECTED     candidate → AVAILABLE
//! ```
//!
//! The referral status and candidate availability commit in one unit of work
//! (`RecruitingStore::apply_transition`).

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::candidate::Availability;
use crate::models::referral::{Referral, ReferralStatus};
use crate::store::{RecruitingStore, StoreError, TransitionContext, TransitionPlan};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("referral {0} not found")]
    ReferralNotFound(Uuid),

    #[error("referral {referral_id} cannot move from {from} to {to}")]
    InvalidTransition {
        referral_id: Uuid,
        from: &'static str,
        to: &'static str,
    },

    #[error("candidate {candidate_id} already holds active referral {active_referral_id}")]
    CandidateEngaged {
        candidate_id: Uuid,
        active_referral_id: Uuid,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Availability change implied by moving a referral from `prior` to `target`.
pub fn availability_effect(prior: ReferralStatus, target: ReferralStatus) -> Option<Availability> {
    match (prior, target) {
        (_, ReferralStatus::Selected) => Some(Availability::OnProject),
        (_, ReferralStatus::Reserved) => Some(Availability::Reserved),
        (ReferralStatus::Reserved, ReferralStatus::Rejected) => Some(Availability::Available),
        _ => None,
    }
}

/// Validates a reviewer decision against the locked referral state.
pub fn plan_transition(
    ctx: &TransitionContext<'_>,
    target: ReferralStatus,
) -> Result<TransitionPlan, DecisionError> {
    let referral = ctx.referral;

    if target == ReferralStatus::PendingReview {
        return Err(DecisionError::InvalidTransition {
            referral_id: referral.id,
            from: referral.status.as_str(),
            to: target.as_str(),
        });
    }

    if target.is_active() {
        if let Some(active_referral_id) = ctx.other_active_referral {
            return Err(DecisionError::CandidateEngaged {
                candidate_id: referral.candidate_id,
                active_referral_id,
            });
        }
    }

    Ok(TransitionPlan {
        status: target,
        availability: availability_effect(referral.status, target),
    })
}

/// Entry point for reviewer decisions.
#[derive(Clone)]
pub struct ReferralStateMachine {
    store: Arc<dyn RecruitingStore>,
}

impl ReferralStateMachine {
    pub fn new(store: Arc<dyn RecruitingStore>) -> Self {
        Self { store }
    }

    /// Applies `new_status` to the referral and its side effect on the candidate.
    pub async fn apply_decision(
        &self,
        referral_id: Uuid,
        new_status: ReferralStatus,
    ) -> Result<Referral, DecisionError> {
        let rule = move |ctx: &TransitionContext<'_>| plan_transition(ctx, new_status);

        match self.store.apply_transition(referral_id, &rule).await {
            Ok(applied) => {
                info!(
                    "Referral {} moved {} -> {} (candidate {}, availability {})",
                    referral_id,
                    applied.previous_status.as_str(),
                    applied.referral.status.as_str(),
                    applied.referral.candidate_id,
                    applied
                        .availability
                        .map(|a| a.as_str())
                        .unwrap_or("unchanged"),
                );
                Ok(applied.referral)
            }
            Err(DecisionError::Store(e)) => {
                error!(
                    "Decision {} for referral {} rolled back: {e}",
                    new_status.as_str(),
                    referral_id
                );
                Err(DecisionError::Store(e))
            }
            Err(e) => {
                warn!("Decision rejected for referral {referral_id}: {e}");
                Err(e)
            }
        }
    }
}
