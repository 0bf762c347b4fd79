//! Repository layer — table-scoped database operations.
//!
//! Functions take a borrowed `Connection` (or a `Transaction`, which derefs
//! to one) so the service layer decides transaction boundaries.

mod audit;
mod doctor;
mod lifecycle;
mod patient;
mod staff;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use super::{parse_timestamp, DatabaseError};

pub use audit::*;
pub use doctor::*;
pub use lifecycle::*;
pub use patient::*;
pub use staff::*;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn uuid_column(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn enum_column<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr<Err = DatabaseError>,
{
    value.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_column(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    parse_timestamp(&value).ok_or_else(|| {
        conversion_error(
            idx,
            DatabaseError::ConstraintViolation(format!("malformed timestamp: {value}")),
        )
    })
}

pub(crate) fn optional_timestamp_column(
    idx: usize,
    value: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| timestamp_column(idx, v)).transpose()
}

/// `%term%` with LIKE wildcards in the term escaped (escape char `\`).
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
