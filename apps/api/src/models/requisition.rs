use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequisitionStatus {
    Open,
    Closed,
}

impl RequisitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequisitionStatus::Open => "OPEN",
            RequisitionStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for RequisitionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(RequisitionStatus::Open),
            "CLOSED" => Ok(RequisitionStatus::Closed),
            other => Err(UnknownVariant::new("requisition status", other)),
        }
    }
}

/// A job opening submitted for matching.
#[derive(Debug, Clone, Serialize)]
pub struct Requisition {
    pub id: Uuid,
    pub title: String,
    pub client_name: Option<String>,
    pub document_path: String,
    pub status: RequisitionStatus,
    /// Populated by requirement extraction; `None` until the first successful run.
    pub required_experience: Option<i32>,
    pub manager_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Requisition {
    pub fn is_open(&self) -> bool {
        self.status == RequisitionStatus::Open
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RequisitionRow {
    pub id: Uuid,
    pub title: String,
    pub client_name: Option<String>,
    pub document_path: String,
    pub status: String,
    pub required_experience: Option<i32>,
    pub manager_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<RequisitionRow> for Requisition {
    type Error = UnknownVariant;

    fn try_from(row: RequisitionRow) -> Result<Self, Self::Error> {
        Ok(Requisition {
            id: row.id,
            title: row.title,
            client_name: row.client_name,
            document_path: row.document_path,
            status: row.status.parse()?,
            required_experience: row.required_experience,
            manager_id: row.manager_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewRequisition {
    pub title: String,
    pub client_name: Option<String>,
    pub document_path: String,
    pub manager_id: Uuid,
}
