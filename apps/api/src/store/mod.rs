//! Persistence seam for requisitions, candidates, skills and referrals.
//!
//! `PgStore` is the production backend. The in-memory backend used by tests
//! honours the same contract: referral inserts are unique per
//! (requisition, candidate) and decisions apply atomically.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::candidate::{
    Availability, Candidate, CandidateUpdate, EngagedCandidate, NewCandidate,
};
use crate::models::referral::{NewReferral, Referral, ReferralStatus};
use crate::models::requisition::{NewRequisition, Requisition, RequisitionStatus};
use crate::models::UnknownVariant;
use crate::referrals::decision::DecisionError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(#[from] UnknownVariant),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result of a referral insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Created(Referral),
    /// The (requisition, candidate) pair already has a referral.
    Duplicate,
    /// The requisition was deleted or closed before the write.
    RequisitionUnavailable,
}

#[derive(Debug, Clone)]
pub struct ResumeReplaced {
    pub previous: Option<String>,
}

/// What the decision rule sees, read inside the decision's unit of work.
#[derive(Debug, Clone)]
pub struct TransitionContext<'a> {
    pub referral: &'a Referral,
    pub candidate_availability: Availability,
    /// Another SELECTED/RESERVED referral held by the same candidate, if any.
    pub other_active_referral: Option<Uuid>,
}

/// The writes a decision commits together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub status: ReferralStatus,
    pub availability: Option<Availability>,
}

pub type TransitionRule =
    dyn Fn(&TransitionContext<'_>) -> Result<TransitionPlan, DecisionError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct DecisionApplied {
    pub referral: Referral,
    pub previous_status: ReferralStatus,
    pub availability: Option<Availability>,
}

#[async_trait]
pub trait RecruitingStore: Send + Sync {
    async fn create_requisition(&self, new: NewRequisition) -> Result<Requisition, StoreError>;

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, StoreError>;

    async fn requisitions_for_manager(&self, manager_id: Uuid)
        -> Result<Vec<Requisition>, StoreError>;

    /// Returns `false` when the requisition no longer exists.
    async fn set_required_experience(&self, id: Uuid, years: i32) -> Result<bool, StoreError>;

    async fn set_requisition_status(
        &self,
        id: Uuid,
        status: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError>;

    async fn create_candidate(&self, new: NewCandidate) -> Result<Candidate, StoreError>;

    async fn find_candidate(&self, id: Uuid) -> Result<Option<Candidate>, StoreError>;

    /// Candidates that are `AVAILABLE`, or `ON_PROJECT` with an expected
    /// availability date on or before `threshold`.
    async fn candidates_available_by(
        &self,
        threshold: NaiveDate,
    ) -> Result<Vec<Candidate>, StoreError>;

    /// Points the candidate at a new resume. `None` when the candidate is unknown.
    async fn replace_resume_path(
        &self,
        id: Uuid,
        path: &str,
    ) -> Result<Option<ResumeReplaced>, StoreError>;

    /// Replaces the candidate's skill set, reusing vocabulary entries
    /// case-insensitively. Returns the stored names.
    async fn replace_candidate_skills(
        &self,
        id: Uuid,
        skills: &[String],
    ) -> Result<Vec<String>, StoreError>;

    /// Rewrites the profile fields and replaces the skill set in one unit.
    /// `None` when the candidate is unknown.
    async fn update_candidate(
        &self,
        id: Uuid,
        update: &CandidateUpdate,
    ) -> Result<Option<Candidate>, StoreError>;

    async fn engaged_candidates(&self) -> Result<Vec<EngagedCandidate>, StoreError>;

    async fn insert_referral(&self, new: NewReferral) -> Result<InsertOutcome, StoreError>;

    /// Referrals for a requisition, highest score first.
    async fn referrals_for_requisition(
        &self,
        requisition_id: Uuid,
    ) -> Result<Vec<Referral>, StoreError>;

    async fn find_referral(&self, id: Uuid) -> Result<Option<Referral>, StoreError>;

    /// Locks the referral and its candidate, asks `rule` for the plan and
    /// commits the referral status and candidate availability together.
    async fn apply_transition(
        &self,
        referral_id: Uuid,
        rule: &TransitionRule,
    ) -> Result<DecisionApplied, DecisionError>;
}

pub(crate) fn decode<R, T>(row: R) -> Result<T, StoreError>
where
    T: TryFrom<R, Error = UnknownVariant>,
{
    Ok(T::try_from(row)?)
}
