use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::RecordTable;

/// Current `deleted_at` of a row: `None` if the row does not exist,
/// `Some(None)` if active, `Some(Some(ts))` if soft-deleted.
pub fn get_deleted_at(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
) -> Result<Option<Option<String>>, DatabaseError> {
    let state = conn
        .query_row(
            &format!("SELECT deleted_at FROM {} WHERE id = ?1", table.as_str()),
            params![id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(state)
}

/// Set `deleted_at` on an active row. Returns rows changed; 0 means the row
/// is missing or already soft-deleted.
pub fn mark_deleted(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
    deleted_at: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            table.as_str()
        ),
        params![id.to_string(), deleted_at],
    )?;
    Ok(changed)
}

/// Clear `deleted_at` on a soft-deleted row. Returns rows changed.
pub fn clear_deleted(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET deleted_at = NULL WHERE id = ?1 AND deleted_at IS NOT NULL",
            table.as_str()
        ),
        params![id.to_string()],
    )?;
    Ok(changed)
}

/// Physically remove a soft-deleted row. Active rows are never removed.
pub fn purge_deleted(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE id = ?1 AND deleted_at IS NOT NULL",
            table.as_str()
        ),
        params![id.to_string()],
    )?;
    Ok(changed)
}

/// Attachment path stored on a row (any lifecycle state).
pub fn get_attachment_path(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
) -> Result<Option<String>, DatabaseError> {
    let (_, path_column) = table.attachment_columns();
    let path = conn
        .query_row(
            &format!("SELECT {path_column} FROM {} WHERE id = ?1", table.as_str()),
            params![id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?;
    Ok(path.flatten())
}

/// Point an active row at a new attachment. Returns rows changed.
pub fn set_attachment(
    conn: &Connection,
    table: RecordTable,
    id: &Uuid,
    url: &str,
    path: &str,
) -> Result<usize, DatabaseError> {
    let (url_column, path_column) = table.attachment_columns();
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET {url_column} = ?2, {path_column} = ?3
             WHERE id = ?1 AND deleted_at IS NULL",
            table.as_str()
        ),
        params![id.to_string(), url, path],
    )?;
    Ok(changed)
}

/// Every blob path referenced by any row of the table, active or deleted.
pub fn referenced_attachment_paths(
    conn: &Connection,
    table: RecordTable,
) -> Result<HashSet<String>, DatabaseError> {
    let (_, path_column) = table.attachment_columns();
    let mut stmt = conn.prepare(&format!(
        "SELECT {path_column} FROM {} WHERE {path_column} IS NOT NULL",
        table.as_str()
    ))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
