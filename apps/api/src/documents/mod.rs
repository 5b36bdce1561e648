//! Document storage and text extraction.
//!
//! Stored documents are addressed by a relative key `<subfolder>/<uuid>.<ext>`;
//! the key is what requisitions and candidates persist.

pub mod docx;
pub mod extract;
pub mod filesystem;
pub mod s3;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub const REQUISITIONS_FOLDER: &str = "requisitions";
pub const RESUMES_FOLDER: &str = "resumes";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot store an empty document")]
    Empty,

    #[error("invalid document path '{0}'")]
    InvalidPath(String),

    #[error("document '{0}' not found")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `bytes` under `subfolder`, keeping the extension of `file_name`.
    /// Returns the key to persist.
    async fn store(
        &self,
        bytes: Bytes,
        subfolder: &str,
        file_name: &str,
    ) -> Result<String, DocumentError>;

    async fn load(&self, path: &str) -> Result<Bytes, DocumentError>;

    /// Deleting a missing document succeeds.
    async fn delete(&self, path: &str) -> Result<(), DocumentError>;
}

/// Lower-cased file extension, used as the text extractor's format hint.
pub fn format_hint(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// Rejects absolute keys and any `..` component.
pub fn validate_key(path: &str) -> Result<(), DocumentError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.starts_with('\\')
        || path.split(['/', '\\']).any(|part| part == "..");
    if invalid {
        return Err(DocumentError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Builds a fresh key for a document about to be stored.
pub fn new_key(subfolder: &str, file_name: &str) -> Result<String, DocumentError> {
    if file_name.contains("..") {
        return Err(DocumentError::InvalidPath(file_name.to_string()));
    }
    let key = match format_hint(file_name) {
        Some(ext) => format!("{subfolder}/{}.{ext}", Uuid::new_v4()),
        None => format!("{subfolder}/{}", Uuid::new_v4()),
    };
    validate_key(&key)?;
    Ok(key)
}
