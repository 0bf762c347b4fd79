use rusqlite::Connection;
use uuid::Uuid;

use super::validation::validate_patient;
use super::{write_tx, RecordError};
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db;
use crate::models::*;

const TABLE: RecordTable = RecordTable::Patients;

fn ensure_assignable(conn: &Connection, doctor_id: &Uuid) -> Result<(), RecordError> {
    if !db::is_doctor_assignable(conn, doctor_id)? {
        return Err(RecordError::DoctorNotAssignable(*doctor_id));
    }
    Ok(())
}

pub fn create_patient(
    conn: &mut Connection,
    session: &SessionContext,
    input: &PatientInput,
) -> Result<Patient, RecordError> {
    authorization::require(session, Capability::ManagePatients)?;
    let gender = validate_patient(input)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        name: input.name.trim().to_string(),
        age: input.age as u32,
        gender,
        contact: input.contact.trim().to_string(),
        diagnosis: input.diagnosis.trim().to_string(),
        assigned_doctor_id: input.assigned_doctor_id,
        report_image_url: None,
        report_image_path: None,
        deleted_at: None,
        created_at: db::now_utc(),
    };

    let tx = write_tx(conn)?;
    if let Some(doctor_id) = &patient.assigned_doctor_id {
        ensure_assignable(&tx, doctor_id)?;
    }
    db::insert_patient(&tx, &patient)?;
    db::insert_audit_entry(&tx, AuditAction::Insert, TABLE, &patient.id, Some(&session.user_id))?;
    tx.commit()?;

    tracing::info!(record_id = %patient.id, user_id = %session.user_id, "Patient created");
    Ok(patient)
}

/// Overwrite the editable fields. A doctor is only checked for availability
/// when the assignment changes, so editing a patient whose doctor has since
/// been deleted does not force a reassignment.
pub fn update_patient(
    conn: &mut Connection,
    session: &SessionContext,
    id: &Uuid,
    input: &PatientInput,
) -> Result<Patient, RecordError> {
    authorization::require(session, Capability::ManagePatients)?;
    let gender = validate_patient(input)?;

    let tx = write_tx(conn)?;
    let existing = db::get_patient(&tx, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))?;
    if !existing.is_active() {
        return Err(RecordError::inactive(TABLE, id));
    }
    if let Some(doctor_id) = &input.assigned_doctor_id {
        if existing.assigned_doctor_id.as_ref() != Some(doctor_id) {
            ensure_assignable(&tx, doctor_id)?;
        }
    }
    db::update_patient_fields(&tx, id, input, gender)?;
    db::insert_audit_entry(&tx, AuditAction::Update, TABLE, id, Some(&session.user_id))?;
    let updated = db::get_patient(&tx, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))?;
    tx.commit()?;

    tracing::info!(record_id = %id, user_id = %session.user_id, "Patient updated");
    Ok(updated)
}

/// Point lookup. Soft-deleted patients are only visible to roles that may
/// see the deleted-records view.
pub fn get_patient(
    conn: &Connection,
    session: &SessionContext,
    id: &Uuid,
) -> Result<Patient, RecordError> {
    authorization::require(session, Capability::ManagePatients)?;
    let patient = db::get_patient(conn, id)?.ok_or_else(|| RecordError::not_found(TABLE, id))?;
    if !patient.is_active()
        && !authorization::check(session, Capability::ViewDeletedRecords).allowed
    {
        return Err(RecordError::not_found(TABLE, id));
    }
    Ok(patient)
}

pub fn list_patients(
    conn: &Connection,
    session: &SessionContext,
    search: Option<&str>,
) -> Result<Vec<PatientListItem>, RecordError> {
    authorization::require(session, Capability::ManagePatients)?;
    let filter = RecordFilter::active().search(search.unwrap_or_default());
    Ok(db::list_patients(conn, &filter)?)
}
