//! Plain-text extraction from stored documents.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::documents::docx::docx_text;

pub const SUPPORTED_FORMATS: &[&str] = &["pdf", "docx", "txt", "md"];

pub fn is_supported(format_hint: Option<&str>) -> bool {
    format_hint.is_some_and(|f| SUPPORTED_FORMATS.contains(&f))
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to parse document: {0}")]
    Parse(String),
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, bytes: Bytes, format_hint: Option<&str>) -> Result<String, ExtractError>;
}

/// Supports `pdf`, `docx` and UTF-8 `txt`/`md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentTextExtractor;

#[async_trait]
impl TextExtractor for DocumentTextExtractor {
    async fn extract(&self, bytes: Bytes, format_hint: Option<&str>) -> Result<String, ExtractError> {
        let text = match format_hint {
            Some("pdf") => tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| ExtractError::Parse(format!("pdf worker failed: {e}")))?
                .map_err(|e| ExtractError::Parse(e.to_string()))?,
            Some("docx") => tokio::task::spawn_blocking(move || docx_text(&bytes))
                .await
                .map_err(|e| ExtractError::Parse(format!("docx worker failed: {e}")))??,
            Some("txt") | Some("md") => String::from_utf8(bytes.to_vec())
                .map_err(|e| ExtractError::Parse(format!("not valid UTF-8: {e}")))?,
            Some(other) => return Err(ExtractError::UnsupportedFormat(other.to_string())),
            None => return Err(ExtractError::UnsupportedFormat("<none>".to_string())),
        };

        if text.trim().is_empty() {
            return Err(ExtractError::Parse("document contains no text".to_string()));
        }
        Ok(text)
    }
}
