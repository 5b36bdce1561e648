//! Candidate profiles, resume uploads and the engaged view.

pub mod handlers;
pub mod skills;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::candidates::skills::{normalize_skills, SkillExtractor};
use crate::documents::{DocumentError, DocumentStore, RESUMES_FOLDER};
use crate::ingestion::{validate_upload, IngestError};
use crate::models::candidate::{Candidate, CandidateUpdate, EngagedCandidate, NewCandidate};
use crate::store::{RecruitingStore, StoreError};

#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("{0}")]
    Validation(String),

    #[error("candidate {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn RecruitingStore>,
    documents: Arc<dyn DocumentStore>,
    skills: SkillExtractor,
}

impl CandidateService {
    pub fn new(
        store: Arc<dyn RecruitingStore>,
        documents: Arc<dyn DocumentStore>,
        skills: SkillExtractor,
    ) -> Self {
        Self {
            store,
            documents,
            skills,
        }
    }

    pub async fn create(&self, new: NewCandidate) -> Result<Candidate, CandidateError> {
        new.validate().map_err(CandidateError::Validation)?;
        let created = self
            .store
            .create_candidate(NewCandidate {
                full_name: new.full_name.trim().to_string(),
                ..new
            })
            .await?;
        info!("Candidate {} created ({})", created.id, created.availability.as_str());
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<Candidate, CandidateError> {
        self.store
            .find_candidate(id)
            .await?
            .ok_or(CandidateError::NotFound(id))
    }

    /// Rewrites the profile and its skill set. An expected availability date
    /// is dropped unless the candidate stays `ON_PROJECT`.
    pub async fn update(
        &self,
        id: Uuid,
        update: CandidateUpdate,
    ) -> Result<Candidate, CandidateError> {
        update.validate().map_err(CandidateError::Validation)?;
        let mut update = update.normalized();
        update.skills = normalize_skills(&update.skills);

        let updated = self
            .store
            .update_candidate(id, &update)
            .await?
            .ok_or(CandidateError::NotFound(id))?;
        info!(
            "Candidate {id} profile updated ({}, {} skills)",
            updated.availability.as_str(),
            updated.skills.len()
        );
        Ok(updated)
    }

    pub async fn engaged(&self) -> Result<Vec<EngagedCandidate>, CandidateError> {
        Ok(self.store.engaged_candidates().await?)
    }

    /// Stores the new resume, repoints the candidate, removes the previous
    /// file and schedules skill extraction. Returns the new resume key.
    pub async fn upload_resume(
        &self,
        candidate_id: Uuid,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, CandidateError> {
        validate_upload(file_name, &bytes).map_err(|e| match e {
            IngestError::Validation(msg) => CandidateError::Validation(msg),
            other => CandidateError::Validation(other.to_string()),
        })?;
        if self.store.find_candidate(candidate_id).await?.is_none() {
            return Err(CandidateError::NotFound(candidate_id));
        }

        let path = self.documents.store(bytes, RESUMES_FOLDER, file_name).await?;

        let replaced = match self.store.replace_resume_path(candidate_id, &path).await {
            Ok(Some(replaced)) => replaced,
            Ok(None) => {
                self.discard(&path).await;
                return Err(CandidateError::NotFound(candidate_id));
            }
            Err(e) => {
                self.discard(&path).await;
                return Err(e.into());
            }
        };

        if let Some(previous) = replaced.previous.filter(|p| *p != path) {
            self.discard(&previous).await;
        }
        info!("Candidate {candidate_id} resume updated to {path}");

        let skills = self.skills.clone();
        let resume_path = path.clone();
        tokio::spawn(async move {
            skills.extract_and_save(candidate_id, &resume_path).await;
        });

        Ok(path)
    }

    async fn discard(&self, path: &str) {
        if let Err(e) = self.documents.delete(path).await {
            warn!("Failed to delete document {path}: {e}");
        }
    }
}
