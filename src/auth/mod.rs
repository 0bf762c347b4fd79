//! Staff authentication: password hashing, bearer sessions, password reset.

pub mod account;
pub mod password;
pub mod session;
pub mod token;

use thiserror::Error;

pub use account::*;
pub use session::*;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Reset token invalid or expired")]
    InvalidResetToken,

    #[error("Cannot remove the last administrator")]
    LastAdmin,

    #[error("Staff user not found")]
    UserNotFound,

    #[error("Stored password hash is malformed")]
    CorruptedHash,

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl From<rusqlite::Error> for AuthError {
    fn from(err: rusqlite::Error) -> Self {
        AuthError::Database(err.into())
    }
}
