//! Match Scorer: one inference call per (requisition, candidate) pair.
//!
//! Any failure here is scoped to the single candidate being scored.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{parse_json, InferenceClient, LlmError};
use crate::matching::prompts::{PromptTemplate, REQUISITION_TEXT, RESUME_TEXT};

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchScore {
    pub score: i32,
    pub justification: String,
    pub matching_skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MatchResponse {
    score: f64,
    #[serde(default)]
    justification: String,
    #[serde(default, alias = "matchingSkills")]
    matching_skills: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("inference call failed: {0}")]
    Inference(#[from] LlmError),

    #[error("inference call exceeded {0:?}")]
    Timeout(Duration),
}

/// Trims, drops blanks and removes case-insensitive repeats, keeping order.
pub fn clean_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(skills.len());
    let mut cleaned = Vec::with_capacity(skills.len());
    for skill in skills {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        cleaned.push(trimmed.to_string());
    }
    cleaned
}

/// Parses a raw completion into a score clamped to 0..=100.
pub fn parse_match_score(raw: &str) -> Result<MatchScore, LlmError> {
    let response: MatchResponse = parse_json(raw)?;
    let score = (response.score.round() as i64).clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as i32;
    Ok(MatchScore {
        score,
        justification: response.justification.trim().to_string(),
        matching_skills: clean_skills(response.matching_skills),
    })
}

#[derive(Clone)]
pub struct MatchScorer {
    llm: Arc<dyn InferenceClient>,
    prompt: PromptTemplate,
    call_timeout: Duration,
}

impl MatchScorer {
    pub fn new(llm: Arc<dyn InferenceClient>, prompt: PromptTemplate, call_timeout: Duration) -> Self {
        Self {
            llm,
            prompt,
            call_timeout,
        }
    }

    pub async fn score(
        &self,
        requisition_text: &str,
        candidate_text: &str,
    ) -> Result<MatchScore, ScoreError> {
        let prompt = self.prompt.render(&[
            (REQUISITION_TEXT, requisition_text),
            (RESUME_TEXT, candidate_text),
        ]);

        let raw = tokio::time::timeout(self.call_timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| ScoreError::Timeout(self.call_timeout))??;

        Ok(parse_match_score(&raw)?)
    }
}
