use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::documents::{new_key, validate_key, DocumentError, DocumentStore};

/// Documents kept as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, DocumentError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl DocumentStore for FilesystemStore {
    async fn store(
        &self,
        bytes: Bytes,
        subfolder: &str,
        file_name: &str,
    ) -> Result<String, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }
        let key = new_key(subfolder, file_name)?;
        let path = self.resolve(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;
        info!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(key)
    }

    async fn load(&self, key: &str) -> Result<Bytes, DocumentError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(DocumentError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), DocumentError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
