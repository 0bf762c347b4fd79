//! Patient endpoints (all staff).
//!
//! - `GET /api/patients?search=` — active patients with assigned doctor name
//! - `POST /api/patients`, `GET|PUT|DELETE /api/patients/:id`
//! - `PUT /api/patients/:id/report` — multipart `file`

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::doctors::SearchQuery;
use super::{parse_id, read_file_field, LifecycleResponse};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::SessionContext;
use crate::models::{Patient, PatientInput, PatientListItem, RecordTable};
use crate::records;

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PatientListItem>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = records::list_patients(&conn, &session, query.search.as_deref())?;
    Ok(Json(patients))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(input): Json<PatientInput>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let mut conn = ctx.core.open_db()?;
    let patient = records::create_patient(&mut conn, &session, &input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(records::get_patient(&conn, &session, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let mut conn = ctx.core.open_db()?;
    Ok(Json(records::update_patient(&mut conn, &session, &id, &input)?))
}

/// `DELETE /api/patients/:id` — soft delete.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let mut conn = ctx.core.open_db()?;
    let outcome =
        records::soft_delete(&mut conn, ctx.core.blobs(), &session, RecordTable::Patients, &id)?;
    Ok(Json(LifecycleResponse::new(RecordTable::Patients, id, outcome)))
}

pub async fn upload_report(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_id(&id, "patient")?;
    let file = read_file_field(multipart).await?;
    let mut conn = ctx.core.open_db()?;
    let patient = records::replace_patient_report(
        &mut conn,
        ctx.core.blobs(),
        &session,
        &id,
        file.as_upload(),
    )?;
    Ok(Json(patient))
}
