//! Requisition ingestion: store the document, create the row, then signal.

pub mod handlers;
pub mod signal;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::documents::extract::{is_supported, SUPPORTED_FORMATS};
use crate::documents::{format_hint, DocumentError, DocumentStore, REQUISITIONS_FOLDER};
use crate::ingestion::signal::{IngestSignal, SignalError};
use crate::models::requisition::{NewRequisition, Requisition, RequisitionStatus};
use crate::store::{RecruitingStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    Validation(String),

    #[error("requisition {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub client_name: Option<String>,
    pub manager_id: Uuid,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Rejects blank titles, empty files and formats the text extractor cannot read.
pub fn validate_upload(file_name: &str, bytes: &Bytes) -> Result<(), IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Validation("uploaded file is empty".to_string()));
    }
    if !is_supported(format_hint(file_name).as_deref()) {
        return Err(IngestError::Validation(format!(
            "unsupported file type '{file_name}', expected one of: {}",
            SUPPORTED_FORMATS.join(", ")
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct RequisitionIngestor {
    store: Arc<dyn RecruitingStore>,
    documents: Arc<dyn DocumentStore>,
    signal: Arc<dyn IngestSignal>,
}

impl RequisitionIngestor {
    pub fn new(
        store: Arc<dyn RecruitingStore>,
        documents: Arc<dyn DocumentStore>,
        signal: Arc<dyn IngestSignal>,
    ) -> Self {
        Self {
            store,
            documents,
            signal,
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<Requisition, IngestError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(IngestError::Validation("title cannot be empty".to_string()));
        }
        validate_upload(&request.file_name, &request.bytes)?;

        let document_path = self
            .documents
            .store(request.bytes, REQUISITIONS_FOLDER, &request.file_name)
            .await?;

        let created = self
            .store
            .create_requisition(NewRequisition {
                title: title.to_string(),
                client_name: request
                    .client_name
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
                document_path: document_path.clone(),
                manager_id: request.manager_id,
            })
            .await;

        let requisition = match created {
            Ok(r) => r,
            Err(e) => {
                if let Err(cleanup) = self.documents.delete(&document_path).await {
                    warn!("Failed to remove orphaned document {document_path}: {cleanup}");
                }
                return Err(e.into());
            }
        };
        info!(
            "Requisition {} created by manager {} ({})",
            requisition.id, requisition.manager_id, requisition.document_path
        );

        if let Err(e) = self.signal.publish(requisition.id).await {
            error!(
                "Requisition {} saved but the ingestion signal failed; rematch to retry: {e}",
                requisition.id
            );
        }
        Ok(requisition)
    }

    /// Publishes the ingestion signal again for an existing requisition.
    pub async fn rematch(&self, requisition_id: Uuid) -> Result<(), IngestError> {
        let requisition = self
            .store
            .find_requisition(requisition_id)
            .await?
            .ok_or(IngestError::NotFound(requisition_id))?;
        if requisition.status != RequisitionStatus::Open {
            return Err(IngestError::Validation(format!(
                "requisition {requisition_id} is closed"
            )));
        }
        self.signal.publish(requisition_id).await?;
        info!("Matching re-triggered for requisition {requisition_id}");
        Ok(())
    }
}
