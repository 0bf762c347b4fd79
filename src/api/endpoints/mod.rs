//! API endpoint handlers.
//!
//! Each module corresponds to a console view or feature. Handlers open a
//! connection per request and delegate to the record and auth services,
//! which apply the access policy.

pub mod admin;
pub mod audit_logs;
pub mod auth;
pub mod dashboard;
pub mod deleted;
pub mod doctors;
pub mod health;
pub mod patients;

use axum::extract::Multipart;
use axum::body::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::models::RecordTable;
use crate::records::{AttachmentUpload, LifecycleOutcome};

pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {entity} ID: {e}")))
}

/// Run CPU-heavy work (password hashing) off the async runtime.
pub(crate) async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("Blocking task failed: {e}")))?
}

/// Outcome of a soft delete or restore.
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    pub id: Uuid,
    pub table: RecordTable,
    /// `false` when the record was already in the requested state.
    pub changed: bool,
}

impl LifecycleResponse {
    pub fn new(table: RecordTable, id: Uuid, outcome: LifecycleOutcome) -> Self {
        Self {
            id,
            table,
            changed: outcome == LifecycleOutcome::Changed,
        }
    }
}

/// The `file` part of a multipart upload.
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn as_upload(&self) -> AttachmentUpload<'_> {
        AttachmentUpload {
            file_name: self.file_name.as_deref(),
            content_type: self.content_type.as_deref(),
            bytes: &self.bytes,
        }
    }
}

pub(crate) async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read upload: {e}")))?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(ApiError::Validation {
        field: "file",
        message: "Missing file field".into(),
    })
}
