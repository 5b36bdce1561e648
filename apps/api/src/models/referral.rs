use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    PendingReview,
    Selected,
    Reserved,
    Rejected,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::PendingReview => "PENDING_REVIEW",
            ReferralStatus::Selected => "SELECTED",
            ReferralStatus::Reserved => "RESERVED",
            ReferralStatus::Rejected => "REJECTED",
        }
    }

    /// Selected and reserved referrals hold the candidate.
    pub fn is_active(&self) -> bool {
        matches!(self, ReferralStatus::Selected | ReferralStatus::Reserved)
    }
}

impl FromStr for ReferralStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_REVIEW" => Ok(ReferralStatus::PendingReview),
            "SELECTED" => Ok(ReferralStatus::Selected),
            "RESERVED" => Ok(ReferralStatus::Reserved),
            "REJECTED" => Ok(ReferralStatus::Rejected),
            other => Err(UnknownVariant::new("referral status", other)),
        }
    }
}

/// A scored pairing of one requisition with one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct Referral {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: i32,
    pub justification: String,
    pub matching_skills: Vec<String>,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReferralRow {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: i32,
    pub justification: String,
    pub matching_skills: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = UnknownVariant;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        Ok(Referral {
            id: row.id,
            requisition_id: row.requisition_id,
            candidate_id: row.candidate_id,
            match_score: row.match_score,
            justification: row.justification,
            matching_skills: row.matching_skills,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewReferral {
    pub requisition_id: Uuid,
    pub candidate_id: Uuid,
    pub match_score: i32,
    pub justification: String,
    pub matching_skills: Vec<String>,
}
