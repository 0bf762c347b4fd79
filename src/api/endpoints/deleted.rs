//! Deleted-records view (admin only): list, restore, purge.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::{parse_id, LifecycleResponse};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::SessionContext;
use crate::models::{Doctor, PatientListItem, RecordTable};
use crate::records;

/// `GET /api/deleted/doctors` — most recently deleted first.
pub async fn doctors(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(records::list_deleted_doctors(&conn, &session)?))
}

/// `GET /api/deleted/patients`
pub async fn patients(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<PatientListItem>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(records::list_deleted_patients(&conn, &session)?))
}

fn restore_in(
    ctx: &ApiContext,
    session: &SessionContext,
    table: RecordTable,
    raw_id: &str,
) -> Result<LifecycleResponse, ApiError> {
    let id = parse_id(raw_id, table.entity_name())?;
    let mut conn = ctx.core.open_db()?;
    let outcome = records::restore(&mut conn, session, table, &id)?;
    Ok(LifecycleResponse::new(table, id, outcome))
}

fn purge_in(
    ctx: &ApiContext,
    session: &SessionContext,
    table: RecordTable,
    raw_id: &str,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(raw_id, table.entity_name())?;
    let mut conn = ctx.core.open_db()?;
    records::purge(&mut conn, ctx.core.blobs(), session, table, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/deleted/doctors/:id/restore`
pub async fn restore_doctor(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    restore_in(&ctx, &session, RecordTable::Doctors, &id).map(Json)
}

/// `POST /api/deleted/patients/:id/restore`
pub async fn restore_patient(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    restore_in(&ctx, &session, RecordTable::Patients, &id).map(Json)
}

/// `DELETE /api/deleted/doctors/:id` — permanent removal.
pub async fn purge_doctor(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    purge_in(&ctx, &session, RecordTable::Doctors, &id)
}

/// `DELETE /api/deleted/patients/:id` — permanent removal.
pub async fn purge_patient(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    purge_in(&ctx, &session, RecordTable::Patients, &id)
}
