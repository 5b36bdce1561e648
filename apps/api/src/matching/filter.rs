//! Candidate Filter: selects who gets scored against a requisition.
//!
//! Stage 1 (store query): available now, or on a project that ends within the horizon.
//! Stage 2 (pure): experience gate and resume presence.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::models::candidate::{Availability, Candidate};
use crate::store::{RecruitingStore, StoreError};

pub const DEFAULT_HORIZON_DAYS: u32 = 90;

/// Why an otherwise-available candidate was not scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    InsufficientExperience { has: i32, requires: i32 },
    MissingResume,
}

#[derive(Debug, Clone, Default)]
pub struct FilteredPool {
    pub eligible: Vec<Candidate>,
    pub skipped: Vec<(Uuid, SkipReason)>,
}

/// Last expected-availability date still inside the horizon.
pub fn availability_threshold(today: NaiveDate, horizon_days: u32) -> NaiveDate {
    today + Duration::days(i64::from(horizon_days))
}

pub fn in_pool(candidate: &Candidate, threshold: NaiveDate) -> bool {
    match candidate.availability {
        Availability::Available => true,
        Availability::OnProject => candidate
            .expected_availability_date
            .map(|d| d <= threshold)
            .unwrap_or(false),
        Availability::Reserved => false,
    }
}

/// Missing experience on either side reads as zero.
pub fn apply_experience_gate(pool: Vec<Candidate>, required_experience: Option<i32>) -> FilteredPool {
    let requires = required_experience.unwrap_or(0);
    let mut filtered = FilteredPool::default();

    for candidate in pool {
        let has = candidate.experience_years();
        if has < requires {
            filtered
                .skipped
                .push((candidate.id, SkipReason::InsufficientExperience { has, requires }));
        } else if candidate.resume_path.is_none() {
            filtered.skipped.push((candidate.id, SkipReason::MissingResume));
        } else {
            filtered.eligible.push(candidate);
        }
    }

    filtered
}

#[derive(Clone)]
pub struct CandidateFilter {
    store: Arc<dyn RecruitingStore>,
    horizon_days: u32,
}

impl CandidateFilter {
    pub fn new(store: Arc<dyn RecruitingStore>, horizon_days: u32) -> Self {
        Self {
            store,
            horizon_days,
        }
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub async fn select_pool(&self, today: NaiveDate) -> Result<Vec<Candidate>, StoreError> {
        let threshold = availability_threshold(today, self.horizon_days);
        self.store.candidates_available_by(threshold).await
    }

    pub async fn eligible_for(
        &self,
        required_experience: Option<i32>,
        today: NaiveDate,
    ) -> Result<FilteredPool, StoreError> {
        let pool = self.select_pool(today).await?;
        Ok(apply_experience_gate(pool, required_experience))
    }
}
