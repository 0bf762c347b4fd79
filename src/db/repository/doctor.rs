use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{like_pattern, optional_timestamp_column, timestamp_column, uuid_column};
use crate::db::{format_timestamp, DatabaseError};
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, name, specialization, email, phone, experience,
     image_url, image_path, deleted_at, created_at";

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: uuid_column(0, row.get(0)?)?,
        name: row.get(1)?,
        specialization: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        experience: row.get(5)?,
        image_url: row.get(6)?,
        image_path: row.get(7)?,
        deleted_at: optional_timestamp_column(8, row.get(8)?)?,
        created_at: timestamp_column(9, row.get(9)?)?,
    })
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, name, specialization, email, phone, experience,
         image_url, image_path, deleted_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            doctor.id.to_string(),
            doctor.name,
            doctor.specialization,
            doctor.email,
            doctor.phone,
            doctor.experience,
            doctor.image_url,
            doctor.image_path,
            doctor.deleted_at.as_ref().map(format_timestamp),
            format_timestamp(&doctor.created_at),
        ],
    )?;
    Ok(())
}

/// Point lookup regardless of lifecycle state.
pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

/// Active listings are newest first; the deleted view is most recently
/// deleted first. Search matches name, specialization or email.
pub fn list_doctors(conn: &Connection, filter: &RecordFilter) -> Result<Vec<Doctor>, DatabaseError> {
    let order = match filter.lifecycle {
        Lifecycle::Active => "created_at DESC, rowid DESC",
        Lifecycle::Deleted => "deleted_at DESC, rowid DESC",
    };
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE {lifecycle}
           AND (?1 IS NULL
                OR casefold(name) LIKE casefold(?1) ESCAPE '\\'
                OR casefold(specialization) LIKE casefold(?1) ESCAPE '\\'
                OR casefold(email) LIKE casefold(?1) ESCAPE '\\')
         ORDER BY {order}",
        lifecycle = filter.lifecycle.where_clause(""),
    );
    let pattern = filter.search.as_deref().map(like_pattern);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern], doctor_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Active doctors for the assignment picker, alphabetical.
pub fn list_doctor_options(conn: &Connection) -> Result<Vec<DoctorOption>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name FROM doctors
         WHERE deleted_at IS NULL
         ORDER BY name COLLATE NOCASE, rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(DoctorOption {
            id: uuid_column(0, row.get(0)?)?,
            name: row.get(1)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Overwrite the editable fields of an active doctor.
/// Returns the number of rows changed (0 when missing or soft-deleted).
pub fn update_doctor_fields(
    conn: &Connection,
    id: &Uuid,
    input: &DoctorInput,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors
         SET name = ?2, specialization = ?3, email = ?4, phone = ?5, experience = ?6
         WHERE id = ?1 AND deleted_at IS NULL",
        params![
            id.to_string(),
            input.name.trim(),
            input.specialization.trim(),
            input.email.trim(),
            input.phone.trim(),
            input.experience,
        ],
    )?;
    Ok(changed)
}

pub fn count_active_doctors(conn: &Connection) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM doctors WHERE deleted_at IS NULL",
        [],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}

/// A doctor can take new patients only while active.
pub fn is_doctor_assignable(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM doctors WHERE id = ?1 AND deleted_at IS NULL",
            params![id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Patients (active or not) still pointing at this doctor.
pub fn count_patients_referencing_doctor(
    conn: &Connection,
    id: &Uuid,
) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE assigned_doctor_id = ?1",
        params![id.to_string()],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}
