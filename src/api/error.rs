//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::{AuthError, RoleChangeError};
use crate::authorization::AccessDenied;
use crate::core_state::CoreError;
use crate::records::RecordError;

/// Structured error response body for console clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Offending input field for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// Where the console should navigate instead of a forbidden view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Session expired")]
    SessionExpired,
    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        redirect: &'static str,
    },
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut field = None;
        let mut redirect = None;
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            ApiError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "SESSION_EXPIRED",
                "Session expired, sign in again".to_string(),
            ),
            ApiError::Forbidden {
                message,
                redirect: to,
            } => {
                redirect = Some(*to);
                (StatusCode::FORBIDDEN, "FORBIDDEN", message.clone())
            }
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Validation {
                field: name,
                message,
            } => {
                field = Some(*name);
                (StatusCode::BAD_REQUEST, "VALIDATION", message.clone())
            }
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                field,
                redirect,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<AccessDenied> for ApiError {
    fn from(err: AccessDenied) -> Self {
        ApiError::Forbidden {
            message: err.to_string(),
            redirect: err.redirect_to(),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Validation { field, message } => ApiError::Validation { field, message },
            RecordError::DoctorNotAssignable(_) => ApiError::Validation {
                field: "assigned_doctor_id",
                message: err.to_string(),
            },
            RecordError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RecordError::Inactive { .. }
            | RecordError::NotDeleted { .. }
            | RecordError::StillReferenced { .. } => ApiError::Conflict(err.to_string()),
            RecordError::Forbidden(denied) => denied.into(),
            RecordError::Database(e) => e.into(),
            RecordError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::Unauthorized => ApiError::Unauthorized,
            AuthError::SessionExpired => ApiError::SessionExpired,
            AuthError::Validation { field, message } => ApiError::Validation { field, message },
            AuthError::EmailTaken | AuthError::LastAdmin => ApiError::Conflict(err.to_string()),
            AuthError::InvalidResetToken => ApiError::BadRequest(err.to_string()),
            AuthError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthError::CorruptedHash => ApiError::Internal(err.to_string()),
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<RoleChangeError> for ApiError {
    fn from(err: RoleChangeError) -> Self {
        match err {
            RoleChangeError::Forbidden(denied) => denied.into(),
            RoleChangeError::Auth(e) => e.into(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        if err.is_constraint_violation() {
            ApiError::Conflict("Conflicts with an existing record".into())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}
