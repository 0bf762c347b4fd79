//! Attachment replacement: upload the new blob, repoint the row, then drop
//! the old blob. The row never points at a blob that does not exist yet.

use std::path::Path;

use mime_guess::mime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::lifecycle::remove_blob_after_commit;
use super::{manage_capability, write_tx, RecordError};
use crate::auth::SessionContext;
use crate::authorization;
use crate::db;
use crate::models::*;
use crate::storage::BlobStore;

/// Image formats accepted for attachments. SVG is excluded because blobs are
/// served from the API origin.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

#[derive(Debug, Clone, Copy)]
pub struct AttachmentUpload<'a> {
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAttachment {
    pub url: String,
    pub path: String,
}

fn is_image(mime: &mime::Mime) -> bool {
    mime.type_() == mime::IMAGE
}

/// Pick the stored extension: the file name's if it names an accepted image
/// type, otherwise one derived from the declared content type.
pub fn image_extension(
    file_name: Option<&str>,
    content_type: Option<&str>,
) -> Result<&'static str, RecordError> {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| mime_guess::from_ext(ext).first().is_some_and(|m| is_image(&m)))
        .and_then(|ext| IMAGE_EXTENSIONS.iter().find(|allowed| **allowed == ext).copied());
    if let Some(ext) = from_name {
        return Ok(ext);
    }

    let from_type = content_type
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .filter(is_image)
        .and_then(|m| mime_guess::get_mime_extensions_str(m.essence_str()))
        .and_then(|known| {
            IMAGE_EXTENSIONS
                .iter()
                .find(|allowed| known.contains(*allowed))
                .copied()
        });
    from_type.ok_or_else(|| RecordError::Validation {
        field: "file",
        message: format!("Only image files are accepted ({})", IMAGE_EXTENSIONS.join(", ")),
    })
}

/// Point a record at `path`, returning the path it referenced before.
fn repoint_attachment(
    conn: &mut Connection,
    session: &SessionContext,
    table: RecordTable,
    id: &Uuid,
    stored: &StoredAttachment,
) -> Result<Option<String>, RecordError> {
    let tx = write_tx(conn)?;
    match db::get_deleted_at(&tx, table, id)? {
        None => return Err(RecordError::not_found(table, id)),
        Some(Some(_)) => return Err(RecordError::inactive(table, id)),
        Some(None) => {}
    }
    let previous = db::get_attachment_path(&tx, table, id)?;
    if db::set_attachment(&tx, table, id, &stored.url, &stored.path)? == 0 {
        return Err(RecordError::inactive(table, id));
    }
    db::insert_audit_entry(&tx, AuditAction::Update, table, id, Some(&session.user_id))?;
    tx.commit()?;
    Ok(previous)
}

/// Replace the attachment of an active record.
///
/// If the row update fails the freshly uploaded blob is removed again; the
/// previous blob is removed only once the new reference is committed.
pub fn replace_attachment(
    conn: &mut Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    table: RecordTable,
    id: &Uuid,
    upload: AttachmentUpload<'_>,
) -> Result<StoredAttachment, RecordError> {
    authorization::require(session, manage_capability(table))?;
    if upload.bytes.is_empty() {
        return Err(RecordError::Validation {
            field: "file",
            message: "File is empty".into(),
        });
    }
    let ext = image_extension(upload.file_name, upload.content_type)?;

    let bucket = table.bucket();
    let path = format!("{}.{ext}", Uuid::new_v4());
    blobs.upload(bucket, &path, upload.bytes)?;
    let stored = StoredAttachment {
        url: blobs.public_url(bucket, &path),
        path,
    };

    let previous = match repoint_attachment(conn, session, table, id, &stored) {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = blobs.remove(bucket, &stored.path) {
                tracing::warn!(
                    record_id = %id,
                    path = %stored.path,
                    error = %cleanup,
                    "Could not remove uploaded blob after failed update"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(record_id = %id, %table, path = %stored.path, "Attachment replaced");
    if let Some(old) = previous.filter(|old| *old != stored.path) {
        remove_blob_after_commit(blobs, bucket, &old, id);
    }
    Ok(stored)
}

pub fn replace_doctor_image(
    conn: &mut Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    id: &Uuid,
    upload: AttachmentUpload<'_>,
) -> Result<Doctor, RecordError> {
    replace_attachment(conn, blobs, session, RecordTable::Doctors, id, upload)?;
    db::get_doctor(conn, id)?.ok_or_else(|| RecordError::not_found(RecordTable::Doctors, id))
}

pub fn replace_patient_report(
    conn: &mut Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    id: &Uuid,
    upload: AttachmentUpload<'_>,
) -> Result<Patient, RecordError> {
    replace_attachment(conn, blobs, session, RecordTable::Patients, id, upload)?;
    db::get_patient(conn, id)?.ok_or_else(|| RecordError::not_found(RecordTable::Patients, id))
}
