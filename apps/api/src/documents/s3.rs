use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;

use crate::documents::{format_hint, new_key, validate_key, DocumentError, DocumentStore};

/// Documents kept in an S3 (or MinIO) bucket under the same key layout as
/// the filesystem store.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

fn content_type(key: &str) -> &'static str {
    match format_hint(key).as_deref() {
        Some("pdf") => "application/pdf",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl DocumentStore for S3Store {
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
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type(&key))
            .send()
            .await
            .map_err(|e| DocumentError::Backend(format!("S3 upload failed: {e}")))?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, key);
        Ok(key)
    }

    async fn load(&self, key: &str) -> Result<Bytes, DocumentError> {
        validate_key(key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    DocumentError::NotFound(key.to_string())
                } else {
                    DocumentError::Backend(format!("S3 download failed: {service}"))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| DocumentError::Backend(format!("S3 body read failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), DocumentError> {
        validate_key(key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| DocumentError::Backend(format!("S3 delete failed: {e}")))?;
        Ok(())
    }
}
