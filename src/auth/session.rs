use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use super::token::{generate_token, hash_token};
use super::AuthError;
use crate::db::{self, format_timestamp, parse_timestamp};
use crate::models::{Role, StaffUser};

/// Who is acting. Resolved once per request from the bearer token and
/// handed explicitly to every operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl SessionContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&StaffUser> for SessionContext {
    fn from(user: &StaffUser) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// A freshly issued bearer token. The plaintext token only exists here.
#[derive(Debug, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionContext,
}

pub fn issue_session(
    conn: &Connection,
    user: &StaffUser,
    ttl: chrono::Duration,
) -> Result<IssuedSession, AuthError> {
    let token = generate_token();
    let expires_at = Utc::now() + ttl;
    db::insert_session(conn, &hash_token(&token), &user.id, &format_timestamp(&expires_at))?;
    tracing::info!(user_id = %user.id, "Session issued");
    Ok(IssuedSession {
        token,
        expires_at,
        user: SessionContext::from(user),
    })
}

/// Resolve a bearer token. Expired sessions are deleted on sight.
pub fn resolve_session(conn: &Connection, token: &str) -> Result<SessionContext, AuthError> {
    let token_hash = hash_token(token);
    let (user, expires_at) =
        db::get_session_user(conn, &token_hash)?.ok_or(AuthError::Unauthorized)?;

    let expired = parse_timestamp(&expires_at).map_or(true, |ts| ts <= Utc::now());
    if expired {
        db::delete_session(conn, &token_hash)?;
        return Err(AuthError::SessionExpired);
    }
    Ok(SessionContext::from(&user))
}

pub fn revoke_session(conn: &Connection, token: &str) -> Result<(), AuthError> {
    db::delete_session(conn, &hash_token(token))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn staff(conn: &Connection, role: Role) -> StaffUser {
        let user = StaffUser {
            id: Uuid::new_v4(),
            email: format!("{}@clinic.test", Uuid::new_v4().simple()),
            full_name: "Test User".into(),
            role,
            created_at: Utc::now(),
        };
        db::insert_staff_user(conn, &user, "unused").unwrap();
        user
    }

    #[test]
    fn issued_token_resolves_to_user() {
        let conn = open_memory_database().unwrap();
        let user = staff(&conn, Role::Staff);
        let issued = issue_session(&conn, &user, chrono::Duration::hours(1)).unwrap();

        let ctx = resolve_session(&conn, &issued.token).unwrap();
        assert_eq!(ctx.user_id, user.id);
        assert_eq!(ctx.role, Role::Staff);
        assert!(!ctx.is_admin());
    }

    #[test]
    fn unknown_token_is_unauthorized() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            resolve_session(&conn, "nope"),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn expired_session_is_rejected_and_removed() {
        let conn = open_memory_database().unwrap();
        let user = staff(&conn, Role::Admin);
        let issued = issue_session(&conn, &user, chrono::Duration::seconds(-5)).unwrap();

        assert!(matches!(
            resolve_session(&conn, &issued.token),
            Err(AuthError::SessionExpired)
        ));
        // Second lookup no longer finds the row at all.
        assert!(matches!(
            resolve_session(&conn, &issued.token),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn revoked_session_no_longer_resolves() {
        let conn = open_memory_database().unwrap();
        let user = staff(&conn, Role::Staff);
        let issued = issue_session(&conn, &user, chrono::Duration::hours(1)).unwrap();
        revoke_session(&conn, &issued.token).unwrap();
        assert!(resolve_session(&conn, &issued.token).is_err());
    }

    #[test]
    fn role_changes_apply_to_existing_sessions() {
        let conn = open_memory_database().unwrap();
        let user = staff(&conn, Role::Staff);
        let issued = issue_session(&conn, &user, chrono::Duration::hours(1)).unwrap();
        db::set_staff_role(&conn, &user.id, Role::Admin).unwrap();
        assert!(resolve_session(&conn, &issued.token).unwrap().is_admin());
    }
}
