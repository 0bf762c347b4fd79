//! Shared application state handed to every request.
//!
//! Holds configuration and the long-lived collaborators (blob store, reset
//! notifier). Database connections are not shared: each request opens its
//! own, and SQLite's WAL mode plus IMMEDIATE write transactions serialize
//! writers.

use std::sync::Arc;

use rusqlite::Connection;

use crate::auth::{LoggingResetNotifier, ResetNotifier};
use crate::config::AppConfig;
use crate::db::{self, DatabaseError};
use crate::models::Bucket;
use crate::records::sweep_orphans;
use crate::storage::{BlobStore, FilesystemBlobStore};

pub struct CoreState {
    pub config: AppConfig,
    blobs: Arc<dyn BlobStore>,
    notifier: Arc<dyn ResetNotifier>,
}

impl CoreState {
    /// Filesystem blobs under the data directory, reset links to the log.
    pub fn new(config: AppConfig) -> Result<Self, CoreError> {
        let blobs = FilesystemBlobStore::new(config.blob_dir(), config.public_url.clone());
        let notifier = LoggingResetNotifier::new(config.public_url.clone());
        Self::with_parts(config, Arc::new(blobs), Arc::new(notifier))
    }

    /// Create the data directory and bring the schema up to date.
    pub fn with_parts(
        config: AppConfig,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Result<Self, CoreError> {
        std::fs::create_dir_all(&config.data_dir)?;
        std::fs::create_dir_all(config.blob_dir())?;
        drop(db::open_database(&config.database_path())?);
        tracing::info!(data_dir = %config.data_dir.display(), "Core state ready");
        Ok(Self {
            config,
            blobs,
            notifier,
        })
    }

    pub fn open_db(&self) -> Result<Connection, CoreError> {
        Ok(db::open_database(&self.config.database_path())?)
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn notifier(&self) -> &dyn ResetNotifier {
        self.notifier.as_ref()
    }

    /// Collect blobs left behind by interrupted uploads. Failures are logged;
    /// startup continues regardless.
    pub fn sweep_orphans_on_startup(&self) {
        let conn = match self.open_db() {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Startup sweep skipped");
                return;
            }
        };
        for bucket in Bucket::ALL {
            if let Err(e) = sweep_orphans(&conn, self.blobs(), *bucket, self.config.sweep_grace) {
                tracing::warn!(%bucket, error = %e, "Startup sweep failed");
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_layout_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path().join("data"));
        let core = CoreState::new(config).unwrap();

        assert!(core.config.database_path().is_file());
        assert!(core.config.blob_dir().is_dir());
        let conn = core.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 7);
    }

    #[test]
    fn startup_sweep_removes_stale_orphans() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::with_data_dir(dir.path());
        config.sweep_grace = std::time::Duration::ZERO;
        let core = CoreState::new(config).unwrap();

        core.blobs()
            .upload(Bucket::DoctorImages, "orphan.png", b"x")
            .unwrap();
        core.sweep_orphans_on_startup();
        assert!(!core.blobs().exists(Bucket::DoctorImages, "orphan.png").unwrap());
    }
}
