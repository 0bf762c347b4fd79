use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{enum_column, timestamp_column, uuid_column};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::*;

/// Append one audit entry. Returns the new entry id.
/// Callers run this inside the transaction of the mutation it describes.
pub fn insert_audit_entry(
    conn: &Connection,
    action: AuditAction,
    table: RecordTable,
    record_id: &Uuid,
    user_id: Option<&Uuid>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO audit_logs (action, table_name, record_id, user_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            action.as_str(),
            table.as_str(),
            record_id.to_string(),
            user_id.map(|u| u.to_string()),
            now_timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first (by id, which is monotonic).
pub fn list_audit_entries(
    conn: &Connection,
    filter: &AuditFilter,
) -> Result<Vec<AuditLogEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, action, table_name, record_id, user_id, created_at
         FROM audit_logs
         WHERE (?1 IS NULL OR table_name = ?1)
           AND (?2 IS NULL OR action = ?2)
           AND (?3 IS NULL OR record_id = ?3)
         ORDER BY id DESC
         LIMIT ?4",
    )?;
    let rows = stmt.query_map(
        params![
            filter.table.map(|t| t.as_str()),
            filter.action.map(|a| a.as_str()),
            filter.record_id,
            filter.effective_limit(),
        ],
        |row| {
            Ok(AuditLogEntry {
                id: row.get(0)?,
                action: enum_column(1, row.get(1)?)?,
                table_name: row.get(2)?,
                record_id: row.get(3)?,
                user_id: row
                    .get::<_, Option<String>>(4)?
                    .map(|u| uuid_column(4, u))
                    .transpose()?,
                created_at: timestamp_column(5, row.get(5)?)?,
            })
        },
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Actions recorded for one row, oldest first.
pub fn audit_actions_for_record(
    conn: &Connection,
    table: RecordTable,
    record_id: &Uuid,
) -> Result<Vec<AuditAction>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT action FROM audit_logs
         WHERE table_name = ?1 AND record_id = ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![table.as_str(), record_id.to_string()], |row| {
        enum_column(0, row.get(0)?)
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_audit_entries(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))?;
    Ok(count)
}
