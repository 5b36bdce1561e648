//! Resume skill extraction into the shared skill vocabulary.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::extract::TextExtractor;
use crate::documents::{format_hint, DocumentStore};
use crate::llm_client::{parse_json, InferenceClient, LlmError};
use crate::matching::prompts::{PromptTemplate, RESUME_TEXT};
use crate::store::RecruitingStore;

#[derive(Debug, Deserialize)]
struct SkillsResponse {
    #[serde(default)]
    skills: Vec<String>,
}

/// Upper-cases the first character, leaving the rest untouched.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trims, drops blanks, dedups case-insensitively (first occurrence wins) and
/// capitalizes.
pub fn normalize_skills(raw: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(raw.len());
    let mut normalized = Vec::with_capacity(raw.len());
    for name in raw {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        normalized.push(capitalize(trimmed));
    }
    normalized
}

pub fn parse_skills(raw: &str) -> Result<Vec<String>, LlmError> {
    let response: SkillsResponse = parse_json(raw)?;
    Ok(normalize_skills(&response.skills))
}

#[derive(Clone)]
pub struct SkillExtractor {
    store: Arc<dyn RecruitingStore>,
    documents: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    llm: Arc<dyn InferenceClient>,
    prompt: PromptTemplate,
    call_timeout: Duration,
}

impl SkillExtractor {
    pub fn new(
        store: Arc<dyn RecruitingStore>,
        documents: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        llm: Arc<dyn InferenceClient>,
        prompt: PromptTemplate,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            documents,
            extractor,
            llm,
            prompt,
            call_timeout,
        }
    }

    pub async fn skills_from_text(&self, resume_text: &str) -> Result<Vec<String>, LlmError> {
        let prompt = self.prompt.render(&[(RESUME_TEXT, resume_text)]);
        let raw = tokio::time::timeout(self.call_timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.call_timeout))??;
        parse_skills(&raw)
    }

    /// Replaces the candidate's skills with those found in the resume.
    /// Returns the stored names, or `None` when skills were left unchanged.
    pub async fn extract_and_save(&self, candidate_id: Uuid, resume_path: &str) -> Option<Vec<String>> {
        info!("Starting skill extraction for candidate {candidate_id} from {resume_path}");

        let bytes = match self.documents.load(resume_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to load resume {resume_path} for candidate {candidate_id}: {e}");
                return None;
            }
        };
        let hint = format_hint(resume_path);
        let text = match self.extractor.extract(bytes, hint.as_deref()).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to parse resume for candidate {candidate_id}: {e}");
                return None;
            }
        };

        let skills = match self.skills_from_text(&text).await {
            Ok(skills) if skills.is_empty() => {
                warn!("No skills found in resume for candidate {candidate_id}");
                return None;
            }
            Ok(skills) => skills,
            Err(e) => {
                error!("Skill extraction failed for candidate {candidate_id}: {e}");
                return None;
            }
        };

        match self.store.replace_candidate_skills(candidate_id, &skills).await {
            Ok(stored) => {
                info!("Updated {} skills for candidate {candidate_id}", stored.len());
                Some(stored)
            }
            Err(e) => {
                error!("Failed to save skills for candidate {candidate_id}: {e}");
                None
            }
        }
    }
}
