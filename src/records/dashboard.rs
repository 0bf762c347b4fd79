use rusqlite::Connection;
use serde::Serialize;

use super::RecordError;
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db;
use crate::models::RecentPatient;

pub const RECENT_PATIENT_LIMIT: u32 = 5;

/// Landing page figures. Soft-deleted rows are not counted.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_doctors: u32,
    pub total_patients: u32,
    pub recent_patients: Vec<RecentPatient>,
}

pub fn dashboard_summary(
    conn: &Connection,
    session: &SessionContext,
) -> Result<DashboardSummary, RecordError> {
    authorization::require(session, Capability::ViewDashboard)?;
    Ok(DashboardSummary {
        total_doctors: db::count_active_doctors(conn)?,
        total_patients: db::count_active_patients(conn)?,
        recent_patients: db::list_recent_patients(conn, RECENT_PATIENT_LIMIT)?,
    })
}
