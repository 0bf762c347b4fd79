//! Administrative endpoints.
//!
//! - `POST /api/admin/blobs/sweep` — orphan sweep over every bucket
//! - `PUT /api/admin/users/:id/role` — change a staff member's role

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::{self, SessionContext};
use crate::models::{Role, StaffUser};
use crate::records::{self, SweepReport};

pub async fn sweep_blobs(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<SweepReport>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let reports = records::sweep_all_buckets(
        &conn,
        ctx.core.blobs(),
        &session,
        ctx.core.config.sweep_grace,
    )?;
    Ok(Json(reports))
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_role(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<StaffUser>, ApiError> {
    let id = parse_id(&id, "user")?;
    let mut conn = ctx.core.open_db()?;
    Ok(Json(auth::set_role(&mut conn, &session, &id, request.role)?))
}
