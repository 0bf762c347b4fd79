use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{enum_column, like_pattern, optional_timestamp_column, timestamp_column, uuid_column};
use crate::db::{format_timestamp, DatabaseError};
use crate::models::*;

const PATIENT_COLUMNS: &str = "p.id, p.name, p.age, p.gender, p.contact, p.diagnosis,
     p.assigned_doctor_id, p.report_image_url, p.report_image_path, p.deleted_at, p.created_at";

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: uuid_column(0, row.get(0)?)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: enum_column(3, row.get(3)?)?,
        contact: row.get(4)?,
        diagnosis: row.get(5)?,
        assigned_doctor_id: row
            .get::<_, Option<String>>(6)?
            .map(|id| uuid_column(6, id))
            .transpose()?,
        report_image_url: row.get(7)?,
        report_image_path: row.get(8)?,
        deleted_at: optional_timestamp_column(9, row.get(9)?)?,
        created_at: timestamp_column(10, row.get(10)?)?,
    })
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, age, gender, contact, diagnosis, assigned_doctor_id,
         report_image_url, report_image_path, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.age,
            patient.gender.as_str(),
            patient.contact,
            patient.diagnosis,
            patient.assigned_doctor_id.map(|id| id.to_string()),
            patient.report_image_url,
            patient.report_image_path,
            patient.deleted_at.as_ref().map(format_timestamp),
            format_timestamp(&patient.created_at),
        ],
    )?;
    Ok(())
}

/// Point lookup regardless of lifecycle state.
pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let patient = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?1"),
            params![id.to_string()],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Patients with their assigned doctor's display name.
/// Search matches name, diagnosis or contact.
pub fn list_patients(
    conn: &Connection,
    filter: &RecordFilter,
) -> Result<Vec<PatientListItem>, DatabaseError> {
    let order = match filter.lifecycle {
        Lifecycle::Active => "p.created_at DESC, p.rowid DESC",
        Lifecycle::Deleted => "p.deleted_at DESC, p.rowid DESC",
    };
    let sql = format!(
        "SELECT {PATIENT_COLUMNS},
                CASE
                    WHEN p.assigned_doctor_id IS NULL THEN NULL
                    WHEN d.id IS NOT NULL AND d.deleted_at IS NULL THEN d.name
                    ELSE 'Unknown'
                END
         FROM patients p
         LEFT JOIN doctors d ON d.id = p.assigned_doctor_id
         WHERE {lifecycle}
           AND (?1 IS NULL
                OR casefold(p.name) LIKE casefold(?1) ESCAPE '\\'
                OR casefold(p.diagnosis) LIKE casefold(?1) ESCAPE '\\'
                OR casefold(p.contact) LIKE casefold(?1) ESCAPE '\\')
         ORDER BY {order}",
        lifecycle = filter.lifecycle.where_clause("p."),
    );
    let pattern = filter.search.as_deref().map(like_pattern);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern], |row| {
        Ok(PatientListItem {
            patient: patient_from_row(row)?,
            assigned_doctor_name: row.get(11)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Most recently added active patients, for the dashboard.
pub fn list_recent_patients(
    conn: &Connection,
    limit: u32,
) -> Result<Vec<RecentPatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, diagnosis, created_at FROM patients
         WHERE deleted_at IS NULL
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(RecentPatient {
            id: uuid_column(0, row.get(0)?)?,
            name: row.get(1)?,
            diagnosis: row.get(2)?,
            created_at: timestamp_column(3, row.get(3)?)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Overwrite the editable fields of an active patient.
/// Returns the number of rows changed (0 when missing or soft-deleted).
pub fn update_patient_fields(
    conn: &Connection,
    id: &Uuid,
    input: &PatientInput,
    gender: Gender,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients
         SET name = ?2, age = ?3, gender = ?4, contact = ?5, diagnosis = ?6,
             assigned_doctor_id = ?7
         WHERE id = ?1 AND deleted_at IS NULL",
        params![
            id.to_string(),
            input.name.trim(),
            input.age,
            gender.as_str(),
            input.contact.trim(),
            input.diagnosis.trim(),
            input.assigned_doctor_id.map(|d| d.to_string()),
        ],
    )?;
    Ok(changed)
}

pub fn count_active_patients(conn: &Connection) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE deleted_at IS NULL",
        [],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}
