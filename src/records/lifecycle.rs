//! Soft delete, restore and purge, shared by both record tables.
//!
//! Each transition runs in its own IMMEDIATE transaction together with its
//! audit entry. Repeating a transition that already happened is a no-op and
//! appends nothing.

use rusqlite::Connection;
use uuid::Uuid;

use super::{manage_capability, write_tx, RecordError};
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db::{self, now_timestamp};
use crate::models::*;
use crate::storage::BlobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Changed,
    /// The record was already in the requested state.
    Unchanged,
}

/// Best-effort blob cleanup after a committed row change. Failures are
/// logged and left for the orphan sweep.
pub(crate) fn remove_blob_after_commit(
    blobs: &dyn BlobStore,
    bucket: Bucket,
    path: &str,
    record_id: &Uuid,
) {
    if let Err(e) = blobs.remove(bucket, path) {
        tracing::warn!(%record_id, %bucket, path, error = %e, "Blob removal failed");
    }
}

/// Mark a record deleted. Its attachment is removed after the commit; the
/// path and URL stay on the row so the deleted-records view shows what was
/// attached.
pub fn soft_delete(
    conn: &mut Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    table: RecordTable,
    id: &Uuid,
) -> Result<LifecycleOutcome, RecordError> {
    authorization::require(session, manage_capability(table))?;

    let tx = write_tx(conn)?;
    match db::get_deleted_at(&tx, table, id)? {
        None => return Err(RecordError::not_found(table, id)),
        Some(Some(_)) => {
            tracing::debug!(record_id = %id, %table, "Already deleted");
            return Ok(LifecycleOutcome::Unchanged);
        }
        Some(None) => {}
    }
    db::mark_deleted(&tx, table, id, &now_timestamp())?;
    db::insert_audit_entry(&tx, AuditAction::SoftDelete, table, id, Some(&session.user_id))?;
    let attachment = db::get_attachment_path(&tx, table, id)?;
    tx.commit()?;

    tracing::info!(record_id = %id, %table, user_id = %session.user_id, "Record soft-deleted");
    if let Some(path) = attachment {
        remove_blob_after_commit(blobs, table.bucket(), &path, id);
    }
    Ok(LifecycleOutcome::Changed)
}

/// Bring a soft-deleted record back. Identity and every other field are kept.
pub fn restore(
    conn: &mut Connection,
    session: &SessionContext,
    table: RecordTable,
    id: &Uuid,
) -> Result<LifecycleOutcome, RecordError> {
    authorization::require(session, Capability::RestoreRecords)?;

    let tx = write_tx(conn)?;
    match db::get_deleted_at(&tx, table, id)? {
        None => return Err(RecordError::not_found(table, id)),
        Some(None) => return Ok(LifecycleOutcome::Unchanged),
        Some(Some(_)) => {}
    }
    db::clear_deleted(&tx, table, id)?;
    db::insert_audit_entry(&tx, AuditAction::Restore, table, id, Some(&session.user_id))?;
    tx.commit()?;

    tracing::info!(record_id = %id, %table, user_id = %session.user_id, "Record restored");
    Ok(LifecycleOutcome::Changed)
}

/// Permanently remove a record that is already soft-deleted.
/// A doctor still assigned to any patient cannot be purged.
pub fn purge(
    conn: &mut Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    table: RecordTable,
    id: &Uuid,
) -> Result<(), RecordError> {
    authorization::require(session, Capability::PurgeRecords)?;

    let tx = write_tx(conn)?;
    match db::get_deleted_at(&tx, table, id)? {
        None => return Err(RecordError::not_found(table, id)),
        Some(None) => {
            return Err(RecordError::NotDeleted {
                entity: table.entity_name(),
                id: *id,
            })
        }
        Some(Some(_)) => {}
    }
    if table == RecordTable::Doctors {
        let references = db::count_patients_referencing_doctor(&tx, id)?;
        if references > 0 {
            return Err(RecordError::StillReferenced {
                entity: table.entity_name(),
                id: *id,
                references,
            });
        }
    }
    let attachment = db::get_attachment_path(&tx, table, id)?;
    db::purge_deleted(&tx, table, id)?;
    db::insert_audit_entry(&tx, AuditAction::Delete, table, id, Some(&session.user_id))?;
    tx.commit()?;

    tracing::info!(record_id = %id, %table, user_id = %session.user_id, "Record purged");
    if let Some(path) = attachment {
        remove_blob_after_commit(blobs, table.bucket(), &path, id);
    }
    Ok(())
}

pub fn list_deleted_doctors(
    conn: &Connection,
    session: &SessionContext,
) -> Result<Vec<Doctor>, RecordError> {
    authorization::require(session, Capability::ViewDeletedRecords)?;
    Ok(db::list_doctors(conn, &RecordFilter::deleted())?)
}

pub fn list_deleted_patients(
    conn: &Connection,
    session: &SessionContext,
) -> Result<Vec<PatientListItem>, RecordError> {
    authorization::require(session, Capability::ViewDeletedRecords)?;
    Ok(db::list_patients(conn, &RecordFilter::deleted())?)
}
