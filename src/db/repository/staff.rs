use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{enum_column, timestamp_column, uuid_column};
use crate::db::{format_timestamp, now_timestamp, DatabaseError};
use crate::models::*;

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<StaffUser> {
    Ok(StaffUser {
        id: uuid_column(0, row.get(0)?)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: enum_column(3, row.get(3)?)?,
        created_at: timestamp_column(4, row.get(4)?)?,
    })
}

pub fn insert_staff_user(
    conn: &Connection,
    user: &StaffUser,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff_users (id, email, full_name, password_hash, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id.to_string(),
            user.email,
            user.full_name,
            password_hash,
            user.role.as_str(),
            format_timestamp(&user.created_at),
        ],
    )?;
    Ok(())
}

/// Case-insensitive lookup. Returns the user with its stored password hash.
pub fn get_staff_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<(StaffUser, String)>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT id, email, full_name, role, created_at, password_hash
             FROM staff_users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            |row| Ok((staff_from_row(row)?, row.get::<_, String>(5)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn get_staff_by_id(conn: &Connection, id: &Uuid) -> Result<Option<StaffUser>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT id, email, full_name, role, created_at FROM staff_users WHERE id = ?1",
            params![id.to_string()],
            staff_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn count_staff_users(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM staff_users", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_admins(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM staff_users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn set_staff_role(conn: &Connection, id: &Uuid, role: Role) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE staff_users SET role = ?2 WHERE id = ?1",
        params![id.to_string(), role.as_str()],
    )?;
    Ok(changed)
}

pub fn set_password_hash(
    conn: &Connection,
    id: &Uuid,
    password_hash: &str,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE staff_users SET password_hash = ?2 WHERE id = ?1",
        params![id.to_string(), password_hash],
    )?;
    Ok(changed)
}

// ── Sessions ────────────────────────────────────────────

pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    expires_at: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO staff_sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id.to_string(), now_timestamp(), expires_at],
    )?;
    Ok(())
}

/// Resolve a session token hash to its user and raw `expires_at`.
pub fn get_session_user(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<(StaffUser, String)>, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT u.id, u.email, u.full_name, u.role, u.created_at, s.expires_at
             FROM staff_sessions s
             JOIN staff_users u ON u.id = s.user_id
             WHERE s.token_hash = ?1",
            params![token_hash],
            |row| Ok((staff_from_row(row)?, row.get::<_, String>(5)?)),
        )
        .optional()?;
    Ok(found)
}

pub fn delete_session(conn: &Connection, token_hash: &str) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM staff_sessions WHERE token_hash = ?1",
        params![token_hash],
    )?;
    Ok(deleted)
}

pub fn delete_sessions_for_user(conn: &Connection, user_id: &Uuid) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM staff_sessions WHERE user_id = ?1",
        params![user_id.to_string()],
    )?;
    Ok(deleted)
}

pub fn prune_expired_sessions(conn: &Connection) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM staff_sessions WHERE expires_at < ?1",
        params![now_timestamp()],
    )?;
    Ok(deleted)
}

// ── Password resets ─────────────────────────────────────

pub fn insert_password_reset(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    expires_at: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO password_resets (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![token_hash, user_id.to_string(), now_timestamp(), expires_at],
    )?;
    Ok(())
}

/// Consume an unused, unexpired reset token. Returns the owning user id.
pub fn consume_password_reset(
    conn: &Connection,
    token_hash: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let now = now_timestamp();
    let user_id = conn
        .query_row(
            "UPDATE password_resets SET used_at = ?2
             WHERE token_hash = ?1 AND used_at IS NULL AND expires_at > ?2
             RETURNING user_id",
            params![token_hash, now],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    user_id
        .map(|id| uuid_column(0, id).map_err(DatabaseError::from))
        .transpose()
}
