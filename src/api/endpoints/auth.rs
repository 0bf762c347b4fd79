//! Authentication endpoints.
//!
//! `POST /api/auth/signup`, `/login`, `/forgot-password`, `/reset-password` —
//! unprotected; credential endpoints are rate-limited per email.
//! `POST /api/auth/logout`, `GET /api/auth/me` — require a session.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::endpoints::blocking;
use crate::api::error::ApiError;
use crate::api::middleware::auth::bearer_token;
use crate::api::types::ApiContext;
use crate::auth::{self, IssuedSession, LoginRequest, SessionContext, SignupRequest};
use crate::models::StaffUser;

fn rate_limit(ctx: &ApiContext, scope: &str, email: &str) -> Result<String, ApiError> {
    let key = format!("{scope}:{}", email.trim().to_lowercase());
    let mut limiter = ctx
        .auth_limiter
        .lock()
        .map_err(|_| ApiError::Internal("auth limiter lock".into()))?;
    limiter
        .check(&key)
        .map_err(|retry_after| ApiError::RateLimited { retry_after })?;
    Ok(key)
}

/// `POST /api/auth/signup` — create a staff account.
pub async fn signup(
    State(ctx): State<ApiContext>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<StaffUser>), ApiError> {
    let core = ctx.core.clone();
    let user = blocking(move || {
        let mut conn = core.open_db()?;
        Ok(auth::signup(&mut conn, &request, core.config.password_iterations)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/auth/login` — email/password → bearer token.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<IssuedSession>, ApiError> {
    let key = rate_limit(&ctx, "login", &request.email)?;

    let core = ctx.core.clone();
    let issued = blocking(move || {
        let conn = core.open_db()?;
        Ok(auth::login(
            &conn,
            &request,
            core.config.session_ttl,
            core.config.password_iterations,
        )?)
    })
    .await?;

    if let Ok(mut limiter) = ctx.auth_limiter.lock() {
        limiter.clear(&key);
    }
    Ok(Json(issued))
}

/// `POST /api/auth/logout` — revoke the presented token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<SessionContext>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let conn = ctx.core.open_db()?;
    auth::revoke_session(&conn, token)?;
    tracing::info!(user_id = %session.user_id, "Signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me` — the caller's session context.
pub async fn me(Extension(session): Extension<SessionContext>) -> Json<SessionContext> {
    Json(session)
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// `POST /api/auth/forgot-password` — same answer whether or not the account exists.
pub async fn forgot_password(
    State(ctx): State<ApiContext>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    rate_limit(&ctx, "reset", &request.email)?;

    let conn = ctx.core.open_db()?;
    auth::request_password_reset(&conn, &request.email, ctx.core.notifier())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "accepted",
            message: "If an account exists for this email, a reset link has been sent",
        }),
    ))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// `POST /api/auth/reset-password` — consume a reset token and set a new password.
pub async fn reset_password(
    State(ctx): State<ApiContext>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let core = ctx.core.clone();
    blocking(move || {
        let mut conn = core.open_db()?;
        Ok(auth::reset_password(
            &mut conn,
            &request.token,
            &request.password,
            core.config.password_iterations,
        )?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
