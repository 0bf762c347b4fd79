//! Record services: the operations the console performs on doctors and
//! patients, each gated by the access policy and audited in the same
//! transaction as the row change.

pub mod attachments;
pub mod audit;
pub mod dashboard;
pub mod doctors;
pub mod lifecycle;
pub mod patients;
pub mod sweep;
mod validation;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;
use uuid::Uuid;

use crate::authorization::{AccessDenied, Capability};
use crate::db::DatabaseError;
use crate::models::RecordTable;
use crate::storage::StorageError;

pub use attachments::*;
pub use audit::*;
pub use dashboard::*;
pub use doctors::*;
pub use lifecycle::*;
pub use patients::*;
pub use sweep::*;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} is deleted")]
    Inactive { entity: &'static str, id: Uuid },

    #[error("{entity} {id} must be deleted before it can be purged")]
    NotDeleted { entity: &'static str, id: Uuid },

    #[error("Doctor {0} is not available for assignment")]
    DoctorNotAssignable(Uuid),

    #[error("{entity} {id} is still referenced by {references} record(s)")]
    StillReferenced {
        entity: &'static str,
        id: Uuid,
        references: u32,
    },

    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for RecordError {
    fn from(err: rusqlite::Error) -> Self {
        RecordError::Database(err.into())
    }
}

impl RecordError {
    pub(crate) fn not_found(table: RecordTable, id: &Uuid) -> Self {
        RecordError::NotFound {
            entity: table.entity_name(),
            id: *id,
        }
    }

    pub(crate) fn inactive(table: RecordTable, id: &Uuid) -> Self {
        RecordError::Inactive {
            entity: table.entity_name(),
            id: *id,
        }
    }
}

/// Mutations take the write lock up front so the row change and its audit
/// entry commit in the order the calls arrived.
pub(crate) fn write_tx(conn: &mut Connection) -> Result<Transaction<'_>, RecordError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Capability needed to create, edit or delete rows of a table.
pub(crate) fn manage_capability(table: RecordTable) -> Capability {
    match table {
        RecordTable::Doctors => Capability::ManageDoctors,
        RecordTable::Patients => Capability::ManagePatients,
    }
}
