//! Requirement Extractor: derives the minimum years of experience from requisition text.
//!
//! Fail-open: anything short of a clean number resolves to 0 so a flaky
//! extraction never blocks matching.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm_client::{parse_json, InferenceClient, LlmError};
use crate::matching::prompts::{PromptTemplate, REQUISITION_TEXT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedRequirement {
    pub required_experience: i32,
}

#[derive(Debug, Deserialize)]
struct RequirementResponse {
    #[serde(default, alias = "requiredExperience")]
    required_experience: Option<Value>,
}

/// Reads a JSON value as a non-negative whole number of years.
fn coerce_years(value: Option<&Value>) -> i32 {
    let years = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches('+')
            .parse::<i64>()
            .ok(),
        _ => None,
    };
    years
        .map(|y| y.clamp(0, i64::from(i32::MAX)) as i32)
        .unwrap_or(0)
}

/// Parses a raw completion. A malformed JSON body is an error; a missing or
/// non-numeric value is 0.
pub fn parse_requirement(raw: &str) -> Result<ExtractedRequirement, LlmError> {
    let response: RequirementResponse = parse_json(raw)?;
    Ok(ExtractedRequirement {
        required_experience: coerce_years(response.required_experience.as_ref()),
    })
}

#[derive(Clone)]
pub struct RequirementExtractor {
    llm: Arc<dyn InferenceClient>,
    prompt: PromptTemplate,
    call_timeout: Duration,
}

impl RequirementExtractor {
    pub fn new(llm: Arc<dyn InferenceClient>, prompt: PromptTemplate, call_timeout: Duration) -> Self {
        Self {
            llm,
            prompt,
            call_timeout,
        }
    }

    pub async fn extract(&self, requisition_text: &str) -> Result<ExtractedRequirement, LlmError> {
        let prompt = self.prompt.render(&[(REQUISITION_TEXT, requisition_text)]);
        let raw = tokio::time::timeout(self.call_timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| LlmError::Timeout(self.call_timeout))??;
        parse_requirement(&raw)
    }

    /// `Some` on a successful extraction, `None` when the caller should
    /// proceed with the zero default.
    pub async fn extract_or_default(
        &self,
        requisition_id: Uuid,
        requisition_text: &str,
    ) -> Option<ExtractedRequirement> {
        match self.extract(requisition_text).await {
            Ok(extracted) => {
                info!(
                    "Extracted required experience for requisition {}: {} years (prompt {})",
                    requisition_id, extracted.required_experience, self.prompt.version
                );
                Some(extracted)
            }
            Err(e) => {
                warn!(
                    "Requirement extraction failed for requisition {requisition_id}; \
                     matching continues with 0 years: {e}"
                );
                None
            }
        }
    }
}
