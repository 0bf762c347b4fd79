//! Doctor endpoints (admin only, except the assignment picker).
//!
//! - `GET /api/doctors?search=` — active doctors, newest first
//! - `GET /api/doctors/options` — `{id, name}` picker entries
//! - `POST /api/doctors`, `GET|PUT|DELETE /api/doctors/:id`
//! - `PUT /api/doctors/:id/image` — multipart `file`

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use super::{parse_id, read_file_field, LifecycleResponse};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::SessionContext;
use crate::models::{Doctor, DoctorInput, DoctorOption, RecordTable};
use crate::records;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Doctor>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctors = records::list_doctors(&conn, &session, query.search.as_deref())?;
    Ok(Json(doctors))
}

pub async fn options(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<DoctorOption>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(records::doctor_options(&conn, &session)?))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Json(input): Json<DoctorInput>,
) -> Result<(StatusCode, Json<Doctor>), ApiError> {
    let mut conn = ctx.core.open_db()?;
    let doctor = records::create_doctor(&mut conn, &session, &input)?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<Doctor>, ApiError> {
    let id = parse_id(&id, "doctor")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(records::get_doctor(&conn, &session, &id)?))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(input): Json<DoctorInput>,
) -> Result<Json<Doctor>, ApiError> {
    let id = parse_id(&id, "doctor")?;
    let mut conn = ctx.core.open_db()?;
    Ok(Json(records::update_doctor(&mut conn, &session, &id, &input)?))
}

/// `DELETE /api/doctors/:id` — soft delete.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let id = parse_id(&id, "doctor")?;
    let mut conn = ctx.core.open_db()?;
    let outcome =
        records::soft_delete(&mut conn, ctx.core.blobs(), &session, RecordTable::Doctors, &id)?;
    Ok(Json(LifecycleResponse::new(RecordTable::Doctors, id, outcome)))
}

pub async fn upload_image(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Doctor>, ApiError> {
    let id = parse_id(&id, "doctor")?;
    let file = read_file_field(multipart).await?;
    let mut conn = ctx.core.open_db()?;
    let doctor =
        records::replace_doctor_image(&mut conn, ctx.core.blobs(), &session, &id, file.as_upload())?;
    Ok(Json(doctor))
}
