use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::SessionContext;
use crate::models::{AuditAction, AuditFilter, AuditLogEntry, RecordTable, DEFAULT_AUDIT_LIMIT};
use crate::records;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub table: Option<String>,
    pub action: Option<String>,
    pub record_id: Option<String>,
    pub limit: Option<u32>,
}

impl AuditQuery {
    fn into_filter(self) -> Result<AuditFilter, ApiError> {
        let table = non_empty(self.table)
            .map(|t| t.parse::<RecordTable>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let action = non_empty(self.action)
            .map(|a| a.to_uppercase().parse::<AuditAction>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(AuditFilter {
            table,
            action,
            record_id: non_empty(self.record_id),
            limit: self.limit.unwrap_or(DEFAULT_AUDIT_LIMIT),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `GET /api/audit-logs?table=&action=&record_id=&limit=` — newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    let filter = query.into_filter()?;
    let conn = ctx.core.open_db()?;
    Ok(Json(records::list_audit_logs(&conn, &session, &filter)?))
}
