//! Versioned prompt templates for the matching pipeline.
//!
//! Built-in templates can be replaced at startup from a JSON file
//! (`PROMPTS_FILE`) of the form:
//!
//! ```json
//! { "match_score": { "version": "2026-10-a", "body": "... {requisition_text} ... {resume_text}" } }
//! ```
//!
//! Each task declares the placeholders its body must contain; overrides that
//! drop one are rejected when loaded.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REQUISITION_TEXT: &str = "requisition_text";
pub const RESUME_TEXT: &str = "resume_text";

const REQUIREMENT_PROMPT_V1: &str = r#"You are an expert data extraction bot. Analyze the following job requisition text.
Identify the minimum required years of experience.
Return the result ONLY as a valid JSON object with a single key "required_experience" whose value is the number as an integer.
If no specific number of years is mentioned, return 0.

Example format: {"required_experience": 5}

Job Requisition Text:
---
{requisition_text}
---"#;

const MATCH_SCORE_PROMPT_V1: &str = r#"You are an expert HR recruitment assistant. Analyze the following job requisition and resume.
1. Provide a matching score from 0 to 100.
2. Provide a summary of at most 2 sentences explaining your score.
3. Identify the top 5 to 6 key skills from the resume that directly match the requisition's requirements.

Return the result ONLY as a valid JSON object like this:
{"score": 92, "justification": "This is a summary.", "matching_skills": ["Java", "Spring Boot", "Microservices", "REST APIs", "SQL"]}

Do not include any text before or after the JSON object.

**Job Requisition:**
{requisition_text}

**Resume:**
{resume_text}"#;

const SKILL_EXTRACTION_PROMPT_V1: &str = r#"You are an expert technical recruiter. Analyze the following resume text and extract all relevant technical skills.
Return the result ONLY as a valid JSON object with a single key "skills" which contains an array of strings. Do not include any explanation or introductory text.

Example format:
{"skills": ["Java", "Spring Boot", "React", "PostgreSQL", "AWS", "Agile", "Team Leadership"]}

Resume Text:
---
{resume_text}
---"#;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read prompt file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid prompt file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt '{prompt}' is missing placeholder {{{placeholder}}}")]
    MissingPlaceholder {
        prompt: &'static str,
        placeholder: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub version: String,
    pub body: String,
}

impl PromptTemplate {
    pub fn new(version: &str, body: &str) -> Self {
        Self {
            version: version.to_string(),
            body: body.to_string(),
        }
    }

    /// Substitutes `{name}` placeholders in one pass, so substituted text is
    /// never re-scanned. Unknown `{...}` sequences are left as-is.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.body.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
        let mut rest = self.body.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let replaced = after.find('}').and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| (*v, close))
            });
            match replaced {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn require(&self, prompt: &'static str, placeholders: &[&'static str]) -> Result<(), PromptError> {
        for placeholder in placeholders {
            if !self.body.contains(&format!("{{{placeholder}}}")) {
                return Err(PromptError::MissingPlaceholder {
                    prompt,
                    placeholder,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PromptSet {
    pub requirement_extraction: PromptTemplate,
    pub match_score: PromptTemplate,
    pub skill_extraction: PromptTemplate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PromptOverrides {
    requirement_extraction: Option<PromptTemplate>,
    match_score: Option<PromptTemplate>,
    skill_extraction: Option<PromptTemplate>,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            requirement_extraction: PromptTemplate::new("v1", REQUIREMENT_PROMPT_V1),
            match_score: PromptTemplate::new("v1", MATCH_SCORE_PROMPT_V1),
            skill_extraction: PromptTemplate::new("v1", SKILL_EXTRACTION_PROMPT_V1),
        }
    }
}

impl PromptSet {
    /// Built-in templates with any overrides from `json` applied.
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        let overrides: PromptOverrides = serde_json::from_str(json)?;
        let defaults = PromptSet::default();

        let set = PromptSet {
            requirement_extraction: overrides
                .requirement_extraction
                .unwrap_or(defaults.requirement_extraction),
            match_score: overrides.match_score.unwrap_or(defaults.match_score),
            skill_extraction: overrides
                .skill_extraction
                .unwrap_or(defaults.skill_extraction),
        };
        set.validate()?;
        Ok(set)
    }

    pub fn load(path: &Path) -> Result<Self, PromptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), PromptError> {
        self.requirement_extraction
            .require("requirement_extraction", &[REQUISITION_TEXT])?;
        self.match_score
            .require("match_score", &[REQUISITION_TEXT, RESUME_TEXT])?;
        self.skill_extraction
            .require("skill_extraction", &[RESUME_TEXT])?;
        Ok(())
    }
}
