use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

pub const FILE_FIELD: &str = "file";

pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A multipart form with at most one file part named `file`.
#[derive(Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_field(&self, name: &str) -> Result<&str, AppError> {
        self.field(name)
            .ok_or_else(|| AppError::Validation(format!("missing form field '{name}'")))
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::Validation(format!("missing file part '{FILE_FIELD}'")))
    }
}

pub async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            form.file = Some(UploadedFile { file_name, bytes });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
