use rusqlite::Connection;
use uuid::Uuid;

use super::validation::validate_doctor;
use super::{write_tx, RecordError};
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db;
use crate::models::*;

const TABLE: RecordTable = RecordTable::Doctors;

pub fn create_doctor(
    conn: &mut Connection,
    session: &SessionContext,
    input: &DoctorInput,
) -> Result<Doctor, RecordError> {
    authorization::require(session, Capability::ManageDoctors)?;
    validate_doctor(input)?;

    let doctor = Doctor {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        specialization: input.specialization.trim().to_string(),
        email: input.email.trim().to_string(),
        phone: input.phone.trim().to_string(),
        experience: input.experience as u32,
        image_url: None,
        image_path: None,
        deleted_at: None,
        created_at: db::now_utc(),
    };

    let tx = write_tx(conn)?;
    db::insert_doctor(&tx, &doctor)?;
    db::insert_audit_entry(&tx, AuditAction::Insert, TABLE, &doctor.id, Some(&session.user_id))?;
    tx.commit()?;

    tracing::info!(record_id = %doctor.id, user_id = %session.user_id, "Doctor created");
    Ok(doctor)
}

/// Overwrite the editable fields. Soft-deleted doctors must be restored first.
pub fn update_doctor(
    conn: &mut Connection,
    session: &SessionContext,
    id: &Uuid,
    input: &DoctorInput,
) -> Result<Doctor, RecordError> {
    authorization::require(session, Capability::ManageDoctors)?;
    validate_doctor(input)?;

    let tx = write_tx(conn)?;
    let existing = db::get_doctor(&tx, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))?;
    if !existing.is_active() {
        return Err(RecordError::inactive(TABLE, id));
    }
    db::update_doctor_fields(&tx, id, input)?;
    db::insert_audit_entry(&tx, AuditAction::Update, TABLE, id, Some(&session.user_id))?;
    let updated = db::get_doctor(&tx, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))?;
    tx.commit()?;

    tracing::info!(record_id = %id, user_id = %session.user_id, "Doctor updated");
    Ok(updated)
}

pub fn get_doctor(
    conn: &Connection,
    session: &SessionContext,
    id: &Uuid,
) -> Result<Doctor, RecordError> {
    authorization::require(session, Capability::ManageDoctors)?;
    db::get_doctor(conn, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))
}

/// Active doctors, newest first, optionally filtered by a search term.
pub fn list_doctors(
    conn: &Connection,
    session: &SessionContext,
    search: Option<&str>,
) -> Result<Vec<Doctor>, RecordError> {
    authorization::require(session, Capability::ManageDoctors)?;
    let filter = RecordFilter::active().search(search.unwrap_or_default());
    Ok(db::list_doctors(conn, &filter)?)
}

/// Assignment picker: active doctors only, by name.
pub fn doctor_options(
    conn: &Connection,
    session: &SessionContext,
) -> Result<Vec<DoctorOption>, RecordError> {
    authorization::require(session, Capability::ListDoctorOptions)?;
    Ok(db::list_doctor_options(conn)?)
}
