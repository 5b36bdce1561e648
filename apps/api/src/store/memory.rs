use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::matching::filter::in_pool;
use crate::models::candidate::{
    Availability, Candidate, CandidateUpdate, EngagedCandidate, NewCandidate,
};
use crate::models::referral::{NewReferral, Referral, ReferralStatus};
use crate::models::requisition::{NewRequisition, Requisition, RequisitionStatus};
use crate::referrals::decision::DecisionError;
use crate::store::{
    DecisionApplied, InsertOutcome, RecruitingStore, ResumeReplaced, StoreError,
    TransitionContext, TransitionRule,
};

#[derive(Default)]
struct MemoryState {
    requisitions: HashMap<Uuid, Requisition>,
    candidates: HashMap<Uuid, Candidate>,
    vocabulary: Vec<String>,
    referrals: Vec<Referral>,
}

impl MemoryState {
    /// Maps names onto the vocabulary case-insensitively, adding new ones.
    fn intern(&mut self, skills: &[String]) -> Vec<String> {
        let mut stored = Vec::with_capacity(skills.len());
        for name in skills {
            let existing = self
                .vocabulary
                .iter()
                .find(|v| v.to_lowercase() == name.to_lowercase())
                .cloned();
            let canonical = match existing {
                Some(v) => v,
                None => {
                    self.vocabulary.push(name.clone());
                    name.clone()
                }
            };
            if !stored.contains(&canonical) {
                stored.push(canonical);
            }
        }
        stored
    }
}

fn sorted(names: &[String]) -> Vec<String> {
    let mut names = names.to_vec();
    names.sort();
    names
}

/// Single-lock store; every method is one unit of work.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    fail_decisions: AtomicBool,
    fail_candidate_queries: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory store lock poisoned")
    }

    pub fn insert_requisition(&self, requisition: Requisition) {
        self.lock().requisitions.insert(requisition.id, requisition);
    }

    pub fn insert_candidate(&self, candidate: Candidate) {
        self.lock().candidates.insert(candidate.id, candidate);
    }

    pub fn insert_referral_row(&self, referral: Referral) {
        self.lock().referrals.push(referral);
    }

    /// Deletes the requisition and cascades to its referrals.
    pub fn remove_requisition(&self, id: Uuid) {
        let mut state = self.lock();
        state.requisitions.remove(&id);
        state.referrals.retain(|r| r.requisition_id != id);
    }

    pub fn requisition(&self, id: Uuid) -> Option<Requisition> {
        self.lock().requisitions.get(&id).cloned()
    }

    pub fn candidate(&self, id: Uuid) -> Option<Candidate> {
        self.lock().candidates.get(&id).cloned()
    }

    pub fn referral(&self, id: Uuid) -> Option<Referral> {
        self.lock().referrals.iter().find(|r| r.id == id).cloned()
    }

    pub fn referrals(&self) -> Vec<Referral> {
        self.lock().referrals.clone()
    }

    pub fn vocabulary(&self) -> Vec<String> {
        self.lock().vocabulary.clone()
    }

    /// Makes candidate pool queries fail.
    pub fn fail_candidate_queries(&self, fail: bool) {
        self.fail_candidate_queries.store(fail, Ordering::SeqCst);
    }

    /// Makes every following decision fail at commit time.
    pub fn fail_decisions(&self, fail: bool) {
        self.fail_decisions.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecruitingStore for InMemoryStore {
    async fn create_requisition(&self, new: NewRequisition) -> Result<Requisition, StoreError> {
        let requisition = Requisition {
            id: Uuid::new_v4(),
            title: new.title,
            client_name: new.client_name,
            document_path: new.document_path,
            status: RequisitionStatus::Open,
            required_experience: None,
            manager_id: new.manager_id,
            created_at: Utc::now(),
        };
        self.insert_requisition(requisition.clone());
        Ok(requisition)
    }

    async fn find_requisition(&self, id: Uuid) -> Result<Option<Requisition>, StoreError> {
        Ok(self.requisition(id))
    }

    async fn requisitions_for_manager(
        &self,
        manager_id: Uuid,
    ) -> Result<Vec<Requisition>, StoreError> {
        let mut found: Vec<Requisition> = self
            .lock()
            .requisitions
            .values()
            .filter(|r| r.manager_id == manager_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn set_required_experience(&self, id: Uuid, years: i32) -> Result<bool, StoreError> {
        let mut state = self.lock();
        match state.requisitions.get_mut(&id) {
            Some(r) => {
                r.required_experience = Some(years);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_requisition_status(
        &self,
        id: Uuid,
        status: RequisitionStatus,
    ) -> Result<Option<Requisition>, StoreError> {
        let mut state = self.lock();
        Ok(state.requisitions.get_mut(&id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }

    async fn create_candidate(&self, new: NewCandidate) -> Result<Candidate, StoreError> {
        let candidate = Candidate {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            years_of_experience: new.years_of_experience,
            availability: new.availability,
            expected_availability_date: new.expected_availability_date,
            resume_path: None,
            skills: vec![],
            updated_at: Utc::now(),
        };
        self.insert_candidate(candidate.clone());
        Ok(candidate)
    }

    async fn find_candidate(&self, id: Uuid) -> Result<Option<Candidate>, StoreError> {
        Ok(self.candidate(id))
    }

    async fn candidates_available_by(
        &self,
        threshold: NaiveDate,
    ) -> Result<Vec<Candidate>, StoreError> {
        if self.fail_candidate_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected query failure".to_string()));
        }
        let mut pool: Vec<Candidate> = self
            .lock()
            .candidates
            .values()
            .filter(|c| in_pool(c, threshold))
            .cloned()
            .collect();
        pool.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(pool)
    }

    async fn replace_resume_path(
        &self,
        id: Uuid,
        path: &str,
    ) -> Result<Option<ResumeReplaced>, StoreError> {
        let mut state = self.lock();
        Ok(state.candidates.get_mut(&id).map(|c| {
            let previous = c.resume_path.replace(path.to_string());
            c.updated_at = Utc::now();
            ResumeReplaced { previous }
        }))
    }

    async fn replace_candidate_skills(
        &self,
        id: Uuid,
        skills: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let mut state = self.lock();
        let stored = state.intern(skills);
        if let Some(c) = state.candidates.get_mut(&id) {
            c.skills = sorted(&stored);
            c.updated_at = Utc::now();
        }
        Ok(stored)
    }

    async fn update_candidate(
        &self,
        id: Uuid,
        update: &CandidateUpdate,
    ) -> Result<Option<Candidate>, StoreError> {
        let mut state = self.lock();
        if !state.candidates.contains_key(&id) {
            return Ok(None);
        }
        let stored = state.intern(&update.skills);
        let Some(c) = state.candidates.get_mut(&id) else {
            return Ok(None);
        };
        c.full_name = update.full_name.clone();
        c.years_of_experience = update.years_of_experience;
        c.availability = update.availability;
        c.expected_availability_date = update.expected_availability_date;
        c.skills = sorted(&stored);
        c.updated_at = Utc::now();
        Ok(Some(c.clone()))
    }

    async fn engaged_candidates(&self) -> Result<Vec<EngagedCandidate>, StoreError> {
        let state = self.lock();
        let mut engaged: Vec<EngagedCandidate> = state
            .candidates
            .values()
            .filter(|c| {
                matches!(
                    c.availability,
                    Availability::OnProject | Availability::Reserved
                )
            })
            .map(|c| {
                let active = state
                    .referrals
                    .iter()
                    .filter(|r| r.candidate_id == c.id && r.status.is_active())
                    .max_by_key(|r| r.updated_at)
                    .and_then(|r| state.requisitions.get(&r.requisition_id));
                EngagedCandidate {
                    candidate_id: c.id,
                    full_name: c.full_name.clone(),
                    availability: c.availability,
                    requisition_id: active.map(|q| q.id),
                    requisition_title: active.map(|q| q.title.clone()),
                    client_name: active.and_then(|q| q.client_name.clone()),
                }
            })
            .collect();
        engaged.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(engaged)
    }

    async fn insert_referral(&self, new: NewReferral) -> Result<InsertOutcome, StoreError> {
        let mut state = self.lock();

        let open = state
            .requisitions
            .get(&new.requisition_id)
            .map(|r| r.is_open())
            .unwrap_or(false);
        if !open {
            return Ok(InsertOutcome::RequisitionUnavailable);
        }

        let duplicate = state.referrals.iter().any(|r| {
            r.requisition_id == new.requisition_id && r.candidate_id == new.candidate_id
        });
        if duplicate {
            return Ok(InsertOutcome::Duplicate);
        }

        let now = Utc::now();
        let referral = Referral {
            id: Uuid::new_v4(),
            requisition_id: new.requisition_id,
            candidate_id: new.candidate_id,
            match_score: new.match_score,
            justification: new.justification,
            matching_skills: new.matching_skills,
            status: ReferralStatus::PendingReview,
            created_at: now,
            updated_at: now,
        };
        state.referrals.push(referral.clone());
        Ok(InsertOutcome::Created(referral))
    }

    async fn referrals_for_requisition(
        &self,
        requisition_id: Uuid,
    ) -> Result<Vec<Referral>, StoreError> {
        let mut found: Vec<Referral> = self
            .lock()
            .referrals
            .iter()
            .filter(|r| r.requisition_id == requisition_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.match_score
                .cmp(&a.match_score)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(found)
    }

    async fn find_referral(&self, id: Uuid) -> Result<Option<Referral>, StoreError> {
        Ok(self.referral(id))
    }

    async fn apply_transition(
        &self,
        referral_id: Uuid,
        rule: &TransitionRule,
    ) -> Result<DecisionApplied, DecisionError> {
        let mut state = self.lock();

        let index = state
            .referrals
            .iter()
            .position(|r| r.id == referral_id)
            .ok_or(DecisionError::ReferralNotFound(referral_id))?;
        let referral = state.referrals[index].clone();

        let candidate_availability = state
            .candidates
            .get(&referral.candidate_id)
            .map(|c| c.availability)
            .ok_or_else(|| {
                StoreError::Unavailable(format!("candidate {} missing", referral.candidate_id))
            })?;

        let other_active_referral = state
            .referrals
            .iter()
            .find(|r| {
                r.candidate_id == referral.candidate_id
                    && r.id != referral.id
                    && r.status.is_active()
            })
            .map(|r| r.id);

        let plan = rule(&TransitionContext {
            referral: &referral,
            candidate_availability,
            other_active_referral,
        })?;

        if self.fail_decisions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".to_string()).into());
        }

        let now = Utc::now();
        {
            let stored = &mut state.referrals[index];
            stored.status = plan.status;
            stored.updated_at = now;
        }
        if let Some(availability) = plan.availability {
            if let Some(c) = state.candidates.get_mut(&referral.candidate_id) {
                c.availability = availability;
                if availability != Availability::OnProject {
                    c.expected_availability_date = None;
                }
                c.updated_at = now;
            }
        }

        Ok(DecisionApplied {
            referral: state.referrals[index].clone(),
            previous_status: referral.status,
            availability: plan.availability,
        })
    }
}
