use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
    Available,
    OnProject,
    Reserved,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "AVAILABLE",
            Availability::OnProject => "ON_PROJECT",
            Availability::Reserved => "RESERVED",
        }
    }
}

impl FromStr for Availability {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Availability::Available),
            "ON_PROJECT" => Ok(Availability::OnProject),
            "RESERVED" => Ok(Availability::Reserved),
            other => Err(UnknownVariant::new("availability", other)),
        }
    }
}

/// An internal profile that can be referred against requisitions.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: String,
    pub years_of_experience: Option<i32>,
    pub availability: Availability,
    /// Only meaningful (and only allowed) while `ON_PROJECT`.
    pub expected_availability_date: Option<NaiveDate>,
    pub resume_path: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Candidate {
    /// Years of experience with a missing value read as zero.
    pub fn experience_years(&self) -> i32 {
        self.years_of_experience.unwrap_or(0)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub full_name: String,
    pub years_of_experience: Option<i32>,
    pub availability: String,
    pub expected_availability_date: Option<NaiveDate>,
    pub resume_path: Option<String>,
    pub skills: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CandidateRow> for Candidate {
    type Error = UnknownVariant;

    fn try_from(row: CandidateRow) -> Result<Self, Self::Error> {
        Ok(Candidate {
            id: row.id,
            full_name: row.full_name,
            years_of_experience: row.years_of_experience,
            availability: row.availability.parse()?,
            expected_availability_date: row.expected_availability_date,
            resume_path: row.resume_path,
            skills: row.skills,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCandidate {
    pub full_name: String,
    pub years_of_experience: Option<i32>,
    pub availability: Availability,
    pub expected_availability_date: Option<NaiveDate>,
}

impl NewCandidate {
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name cannot be empty".to_string());
        }
        if matches!(self.years_of_experience, Some(y) if y < 0) {
            return Err("years_of_experience cannot be negative".to_string());
        }
        check_expected_date(self.availability, self.expected_availability_date)
    }
}

/// Replacement of every editable profile field, skills included.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateUpdate {
    pub full_name: String,
    pub years_of_experience: Option<i32>,
    pub availability: Availability,
    #[serde(default)]
    pub expected_availability_date: Option<NaiveDate>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl CandidateUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name cannot be empty".to_string());
        }
        if matches!(self.years_of_experience, Some(y) if y < 0) {
            return Err("years_of_experience cannot be negative".to_string());
        }
        Ok(())
    }

    /// Trims the name and drops an expected date that no longer applies.
    pub fn normalized(self) -> Self {
        let expected_availability_date = match self.availability {
            Availability::OnProject => self.expected_availability_date,
            _ => None,
        };
        Self {
            full_name: self.full_name.trim().to_string(),
            expected_availability_date,
            ..self
        }
    }
}

/// Enforces that an expected availability date is only set while on a project.
pub fn check_expected_date(
    availability: Availability,
    expected_availability_date: Option<NaiveDate>,
) -> Result<(), String> {
    if expected_availability_date.is_some() && availability != Availability::OnProject {
        return Err(format!(
            "expected_availability_date is only allowed when availability is ON_PROJECT (got {})",
            availability.as_str()
        ));
    }
    Ok(())
}

/// A candidate currently off the bench, with the requisition that took them.
#[derive(Debug, Clone, Serialize)]
pub struct EngagedCandidate {
    pub candidate_id: Uuid,
    pub full_name: String,
    pub availability: Availability,
    pub requisition_id: Option<Uuid>,
    pub requisition_title: Option<String>,
    pub client_name: Option<String>,
}
