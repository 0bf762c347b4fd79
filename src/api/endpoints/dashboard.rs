use axum::extract::State;
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth::SessionContext;
use crate::records::{self, DashboardSummary};

/// `GET /api/dashboard` — counts and the most recent patients.
pub async fn summary(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(records::dashboard_summary(&conn, &session)?))
}
