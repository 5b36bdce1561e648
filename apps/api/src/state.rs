use std::sync::Arc;

use crate::candidates::skills::SkillExtractor;
use crate::candidates::CandidateService;
use crate::documents::extract::TextExtractor;
use crate::documents::DocumentStore;
use crate::ingestion::signal::IngestSignal;
use crate::ingestion::RequisitionIngestor;
use crate::llm_client::InferenceClient;
use crate::matching::orchestrator::{PipelineOrchestrator, PipelineSettings};
use crate::matching::prompts::PromptSet;
use crate::referrals::decision::ReferralStateMachine;
use crate::store::RecruitingStore;

/// Adapters the services are built from.
pub struct Components {
    pub store: Arc<dyn RecruitingStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub llm: Arc<dyn InferenceClient>,
    pub signal: Arc<dyn IngestSignal>,
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecruitingStore>,
    pub ingestor: RequisitionIngestor,
    pub candidates: CandidateService,
    pub decisions: ReferralStateMachine,
    /// Consumed by the ingestion signal consumer, not by handlers.
    pub orchestrator: PipelineOrchestrator,
}

impl AppState {
    pub fn new(components: Components, prompts: &PromptSet, settings: PipelineSettings) -> Self {
        let Components {
            store,
            documents,
            extractor,
            llm,
            signal,
        } = components;

        let orchestrator = PipelineOrchestrator::new(
            store.clone(),
            documents.clone(),
            extractor.clone(),
            llm.clone(),
            prompts,
            settings,
        );
        let skills = SkillExtractor::new(
            store.clone(),
            documents.clone(),
            extractor,
            llm,
            prompts.skill_extraction.clone(),
            settings.call_timeout,
        );

        AppState {
            ingestor: RequisitionIngestor::new(store.clone(), documents.clone(), signal),
            candidates: CandidateService::new(store.clone(), documents, skills),
            decisions: ReferralStateMachine::new(store.clone()),
            orchestrator,
            store,
        }
    }
}
