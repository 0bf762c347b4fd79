use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rusqlite::{Connection, TransactionBehavior};
use serde::Deserialize;
use uuid::Uuid;

use super::password::{hash_password, validate_password, verify_absent_account, verify_password};
use super::session::{issue_session, IssuedSession, SessionContext};
use super::token::{generate_token, hash_token};
use super::AuthError;
use crate::authorization::{self, AccessDenied, Capability};
use crate::db::{self, format_timestamp};
use crate::models::{Role, StaffUser};

/// Reset links stay valid for one hour.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Delivers password-reset tokens to the account owner.
pub trait ResetNotifier: Send + Sync {
    fn send_reset(&self, user: &StaffUser, token: &str, expires_at: DateTime<Utc>);
}

/// Writes the reset link to the log. Suitable for a single-clinic install
/// where the operator relays the link by hand.
pub struct LoggingResetNotifier {
    public_url: String,
}

impl LoggingResetNotifier {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
        }
    }
}

impl ResetNotifier for LoggingResetNotifier {
    fn send_reset(&self, user: &StaffUser, token: &str, expires_at: DateTime<Utc>) {
        tracing::info!(
            user_id = %user.id,
            %expires_at,
            "Password reset requested: {}/reset-password?token={token}",
            self.public_url
        );
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    if !is_valid_email(email) {
        return Err(AuthError::Validation {
            field: "email",
            message: "must be a valid email address".into(),
        });
    }
    Ok(email.to_string())
}

/// Create a staff account. The very first account becomes the administrator.
pub fn signup(
    conn: &mut Connection,
    request: &SignupRequest,
    iterations: u32,
) -> Result<StaffUser, AuthError> {
    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;
    let full_name = request.full_name.trim().to_string();
    let password_hash = hash_password(&request.password, iterations);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let role = if db::count_staff_users(&tx)? == 0 {
        Role::Admin
    } else {
        Role::Staff
    };
    let user = StaffUser {
        id: Uuid::new_v4(),
        email,
        full_name,
        role,
        created_at: db::now_utc(),
    };
    match db::insert_staff_user(&tx, &user, &password_hash) {
        Ok(()) => {}
        Err(e) if e.is_constraint_violation() => return Err(AuthError::EmailTaken),
        Err(e) => return Err(e.into()),
    }
    tx.commit()?;

    tracing::info!(user_id = %user.id, role = %user.role, "Staff account created");
    Ok(user)
}

pub fn login(
    conn: &Connection,
    request: &LoginRequest,
    session_ttl: chrono::Duration,
    iterations: u32,
) -> Result<IssuedSession, AuthError> {
    let Some((user, stored)) = db::get_staff_by_email(conn, request.email.trim())? else {
        // Same hashing cost as a wrong password, so response time does not
        // reveal which emails have accounts.
        verify_absent_account(&request.password, iterations);
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(&request.password, &stored)? {
        tracing::warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    issue_session(conn, &user, session_ttl)
}

/// Issue a one-time reset token if the email belongs to an account.
/// Succeeds either way so callers cannot probe for accounts.
pub fn request_password_reset(
    conn: &Connection,
    email: &str,
    notifier: &dyn ResetNotifier,
) -> Result<(), AuthError> {
    let Some((user, _)) = db::get_staff_by_email(conn, email.trim())? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_token();
    let expires_at = Utc::now() + chrono::Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    db::insert_password_reset(conn, &hash_token(&token), &user.id, &format_timestamp(&expires_at))?;
    notifier.send_reset(&user, &token, expires_at);
    Ok(())
}

/// Consume a reset token, set the new password and sign the user out everywhere.
pub fn reset_password(
    conn: &mut Connection,
    token: &str,
    new_password: &str,
    iterations: u32,
) -> Result<(), AuthError> {
    validate_password(new_password)?;
    let password_hash = hash_password(new_password, iterations);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let user_id = db::consume_password_reset(&tx, &hash_token(token))?
        .ok_or(AuthError::InvalidResetToken)?;
    db::set_password_hash(&tx, &user_id, &password_hash)?;
    let revoked = db::delete_sessions_for_user(&tx, &user_id)?;
    tx.commit()?;

    tracing::info!(%user_id, revoked, "Password reset completed");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum RoleChangeError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<crate::db::DatabaseError> for RoleChangeError {
    fn from(err: crate::db::DatabaseError) -> Self {
        RoleChangeError::Auth(err.into())
    }
}

impl From<rusqlite::Error> for RoleChangeError {
    fn from(err: rusqlite::Error) -> Self {
        RoleChangeError::Auth(err.into())
    }
}

/// Change a user's role. The last administrator cannot be demoted.
pub fn set_role(
    conn: &mut Connection,
    actor: &SessionContext,
    target: &Uuid,
    role: Role,
) -> Result<StaffUser, RoleChangeError> {
    authorization::require(actor, Capability::ManageStaff)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut user = db::get_staff_by_id(&tx, target)?.ok_or(AuthError::UserNotFound)?;
    if user.role == Role::Admin && role != Role::Admin && db::count_admins(&tx)? <= 1 {
        return Err(AuthError::LastAdmin.into());
    }
    db::set_staff_role(&tx, target, role)?;
    tx.commit()?;

    tracing::info!(actor = %actor.user_id, user_id = %target, %role, "Role changed");
    user.role = role;
    Ok(user)
}
