use rusqlite::Connection;

use super::RecordError;
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db;
use crate::models::{AuditFilter, AuditLogEntry};

/// Newest entries first. Reading the trail never writes to it.
pub fn list_audit_logs(
    conn: &Connection,
    session: &SessionContext,
    filter: &AuditFilter,
) -> Result<Vec<AuditLogEntry>, RecordError> {
    authorization::require(session, Capability::ViewAuditLogs)?;
    Ok(db::list_audit_entries(conn, filter)?)
}
