//! Pipeline Orchestrator: one background run per "requisition ingested" signal.
//!
//! ```text
//! TRIGGERED ─► REQUIREMENTS_EXTRACTED ─► CANDIDATES_FILTERED ─► SCORING ─► DONE
//!                                                   per candidate: PENDING → SCORED | FAILED
//! ```
//!
//! A run aborts only when the requisition is missing, its document cannot be
//! read or the store fails before scoring starts. Everything past that point
//! degrades per candidate. A closed requisition is skipped without inference.
//! The extracted requirement is persisted only once the candidate pool is
//! known, so an aborted run leaves the requisition untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::documents::extract::{ExtractError, TextExtractor};
use crate::documents::{format_hint, DocumentError, DocumentStore};
use crate::llm_client::InferenceClient;
use crate::matching::filter::{CandidateFilter, SkipReason};
use crate::matching::prompts::PromptSet;
use crate::matching::requirement::RequirementExtractor;
use crate::matching::scorer::MatchScorer;
use crate::matching::writer::ReferralWriter;
use crate::models::candidate::Candidate;
use crate::store::{InsertOutcome, RecruitingStore, StoreError};

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Triggered,
    RequirementsExtracted,
    CandidatesFiltered,
    Scoring,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Triggered => "TRIGGERED",
            PipelineStage::RequirementsExtracted => "REQUIREMENTS_EXTRACTED",
            PipelineStage::CandidatesFiltered => "CANDIDATES_FILTERED",
            PipelineStage::Scoring => "SCORING",
            PipelineStage::Done => "DONE",
        }
    }
}

/// Terminal state of one candidate's scoring task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Scored { referral_id: Uuid, score: i32 },
    /// A referral for this pair already existed.
    AlreadyReferred,
    /// The requisition was closed or deleted before the write.
    Dropped,
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub requisition_id: Uuid,
    /// `None` when extraction failed and the pool was gated at zero years.
    pub required_experience: Option<i32>,
    pub skipped: Vec<(Uuid, SkipReason)>,
    pub outcomes: Vec<(Uuid, CandidateOutcome)>,
}

impl RunReport {
    fn empty(requisition_id: Uuid) -> Self {
        Self {
            requisition_id,
            required_experience: None,
            skipped: vec![],
            outcomes: vec![],
        }
    }

    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CandidateOutcome::Scored { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CandidateOutcome::Failed { .. }))
            .count()
    }

    pub fn outcome_for(&self, candidate_id: Uuid) -> Option<&CandidateOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == candidate_id)
            .map(|(_, o)| o)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("requisition {0} not found at trigger")]
    RequisitionNotFound(Uuid),

    #[error("requisition {requisition_id} document could not be loaded: {source}")]
    DocumentUnavailable {
        requisition_id: Uuid,
        #[source]
        source: DocumentError,
    },

    #[error("requisition {requisition_id} document could not be read: {source}")]
    DocumentUnreadable {
        requisition_id: Uuid,
        #[source]
        source: ExtractError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub concurrency: usize,
    pub horizon_days: u32,
    pub call_timeout: Duration,
}

struct Pipeline {
    store: Arc<dyn RecruitingStore>,
    documents: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    requirements: RequirementExtractor,
    filter: CandidateFilter,
    scorer: MatchScorer,
    writer: ReferralWriter,
    concurrency: usize,
}

#[derive(Clone)]
pub struct PipelineOrchestrator {
    inner: Arc<Pipeline>,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn RecruitingStore>,
        documents: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        llm: Arc<dyn InferenceClient>,
        prompts: &PromptSet,
        settings: PipelineSettings,
    ) -> Self {
        let pipeline = Pipeline {
            requirements: RequirementExtractor::new(
                llm.clone(),
                prompts.requirement_extraction.clone(),
                settings.call_timeout,
            ),
            filter: CandidateFilter::new(store.clone(), settings.horizon_days),
            scorer: MatchScorer::new(llm, prompts.match_score.clone(), settings.call_timeout),
            writer: ReferralWriter::new(store.clone()),
            concurrency: settings.concurrency.max(1),
            store,
            documents,
            extractor,
        };
        Self {
            inner: Arc::new(pipeline),
        }
    }

    /// Schedules a run in the background and returns immediately.
    pub fn trigger(&self, requisition_id: Uuid) -> JoinHandle<Result<RunReport, RunError>> {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(requisition_id).await })
    }

    /// Runs the pipeline to completion. Run-fatal errors are logged here.
    pub async fn run(&self, requisition_id: Uuid) -> Result<RunReport, RunError> {
        let result = self.execute(requisition_id).await;
        if let Err(e) = &result {
            error!("Requisition {requisition_id}: run aborted: {e}");
        }
        result
    }

    async fn execute(&self, requisition_id: Uuid) -> Result<RunReport, RunError> {
        let p = &self.inner;
        log_stage(requisition_id, PipelineStage::Triggered);

        let requisition = p
            .store
            .find_requisition(requisition_id)
            .await?
            .ok_or(RunError::RequisitionNotFound(requisition_id))?;
        if !requisition.is_open() {
            info!(
                "Requisition {requisition_id} is {}; nothing to match",
                requisition.status.as_str()
            );
            return Ok(RunReport::empty(requisition_id));
        }

        let requisition_text = self
            .read_document(&requisition.document_path)
            .await
            .map_err(|e| match e {
                ReadFailure::Load(source) => RunError::DocumentUnavailable {
                    requisition_id,
                    source,
                },
                ReadFailure::Extract(source) => RunError::DocumentUnreadable {
                    requisition_id,
                    source,
                },
            })?;

        let required_experience = p
            .requirements
            .extract_or_default(requisition_id, &requisition_text)
            .await
            .map(|extracted| extracted.required_experience);
        log_stage(requisition_id, PipelineStage::RequirementsExtracted);

        let pool = p
            .filter
            .eligible_for(required_experience, Utc::now().date_naive())
            .await?;
        for (candidate_id, reason) in &pool.skipped {
            debug!("Requisition {requisition_id}: candidate {candidate_id} skipped ({reason:?})");
        }
        info!(
            "Requisition {}: {} candidates eligible, {} skipped (requires {} years, horizon {} days)",
            requisition_id,
            pool.eligible.len(),
            pool.skipped.len(),
            required_experience.unwrap_or(0),
            p.filter.horizon_days()
        );
        log_stage(requisition_id, PipelineStage::CandidatesFiltered);

        if let Some(years) = required_experience {
            if !p.store.set_required_experience(requisition_id, years).await? {
                warn!("Requisition {requisition_id} vanished before its requirement was saved");
            }
        }

        log_stage(requisition_id, PipelineStage::Scoring);
        let outcomes = self
            .score_all(requisition_id, Arc::from(requisition_text), pool.eligible)
            .await;

        let report = RunReport {
            requisition_id,
            required_experience,
            skipped: pool.skipped,
            outcomes,
        };
        info!(
            "Requisition {}: {} referrals created, {} candidates failed, {} scored in total",
            requisition_id,
            report.created(),
            report.failed(),
            report.outcomes.len()
        );
        log_stage(requisition_id, PipelineStage::Done);
        Ok(report)
    }

    /// Bounded fan-out: at most `concurrency` candidates are in flight.
    async fn score_all(
        &self,
        requisition_id: Uuid,
        requisition_text: Arc<str>,
        candidates: Vec<Candidate>,
    ) -> Vec<(Uuid, CandidateOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.inner.concurrency));
        let mut tasks = JoinSet::new();

        for candidate in candidates {
            let orchestrator = self.clone();
            let semaphore = semaphore.clone();
            let requisition_text = requisition_text.clone();
            tasks.spawn(async move {
                let candidate_id = candidate.id;
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        orchestrator
                            .score_candidate(requisition_id, &requisition_text, &candidate)
                            .await
                    }
                    Err(_) => CandidateOutcome::Failed {
                        reason: "scoring pool closed".to_string(),
                    },
                };
                (candidate_id, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("Requisition {requisition_id}: scoring task aborted: {e}"),
            }
        }
        outcomes
    }

    async fn score_candidate(
        &self,
        requisition_id: Uuid,
        requisition_text: &str,
        candidate: &Candidate,
    ) -> CandidateOutcome {
        let p = &self.inner;
        let candidate_id = candidate.id;

        let failed = |reason: String| {
            warn!("Requisition {requisition_id}: candidate {candidate_id} FAILED: {reason}");
            CandidateOutcome::Failed { reason }
        };

        let Some(resume_path) = candidate.resume_path.as_deref() else {
            return failed("no resume on file".to_string());
        };

        let resume_text = match self.read_document(resume_path).await {
            Ok(text) => text,
            Err(e) => return failed(format!("resume unreadable: {e}")),
        };

        let score = match p.scorer.score(requisition_text, &resume_text).await {
            Ok(score) => score,
            Err(e) => return failed(format!("scoring failed: {e}")),
        };

        match p.writer.save(requisition_id, candidate_id, &score).await {
            Ok(InsertOutcome::Created(referral)) => {
                debug!("Requisition {requisition_id}: candidate {candidate_id} SCORED {}", referral.match_score);
                CandidateOutcome::Scored {
                    referral_id: referral.id,
                    score: referral.match_score,
                }
            }
            Ok(InsertOutcome::Duplicate) => CandidateOutcome::AlreadyReferred,
            Ok(InsertOutcome::RequisitionUnavailable) => CandidateOutcome::Dropped,
            Err(e) => failed(format!("referral write failed: {e}")),
        }
    }

    async fn read_document(&self, path: &str) -> Result<String, ReadFailure> {
        let p = &self.inner;
        let bytes = p.documents.load(path).await.map_err(ReadFailure::Load)?;
        let hint = format_hint(path);
        p.extractor
            .extract(bytes, hint.as_deref())
            .await
            .map_err(ReadFailure::Extract)
    }
}

#[derive(Debug, Error)]
enum ReadFailure {
    #[error(transparent)]
    Load(DocumentError),
    #[error(transparent)]
    Extract(ExtractError),
}

fn log_stage(requisition_id: Uuid, stage: PipelineStage) {
    info!("Requisition {requisition_id}: {}", stage.as_str());
}
