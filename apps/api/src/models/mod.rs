pub mod candidate;
pub mod referral;
pub mod requisition;

use thiserror::Error;

/// Raised when a TEXT enum column holds a value outside the known set.
#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
