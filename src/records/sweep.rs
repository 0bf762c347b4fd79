//! Orphan sweep: delete blobs no row references.
//!
//! Blobs younger than the grace period are left alone so an upload whose row
//! update has not committed yet is never collected.

use std::time::{Duration, SystemTime};

use rusqlite::Connection;
use serde::Serialize;

use super::RecordError;
use crate::auth::SessionContext;
use crate::authorization::{self, Capability};
use crate::db;
use crate::models::Bucket;
use crate::storage::BlobStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub bucket: String,
    pub scanned: usize,
    pub removed: usize,
    pub errors: usize,
}

pub fn sweep_orphans(
    conn: &Connection,
    blobs: &dyn BlobStore,
    bucket: Bucket,
    grace: Duration,
) -> Result<SweepReport, RecordError> {
    let referenced = db::referenced_attachment_paths(conn, bucket.owner_table())?;
    let now = SystemTime::now();
    let mut report = SweepReport {
        bucket: bucket.as_str().to_string(),
        ..Default::default()
    };

    for blob in blobs.list(bucket)? {
        report.scanned += 1;
        if referenced.contains(&blob.path) {
            continue;
        }
        // A modification time in the future counts as brand new.
        let age = now.duration_since(blob.modified).unwrap_or_default();
        if age < grace {
            continue;
        }
        match blobs.remove(bucket, &blob.path) {
            Ok(()) => {
                report.removed += 1;
                tracing::debug!(%bucket, path = %blob.path, "Removed orphaned blob");
            }
            Err(e) => {
                report.errors += 1;
                tracing::warn!(%bucket, path = %blob.path, error = %e, "Orphan removal failed");
            }
        }
    }

    tracing::info!(
        %bucket,
        scanned = report.scanned,
        removed = report.removed,
        errors = report.errors,
        "Orphan sweep finished"
    );
    Ok(report)
}

/// Sweep every bucket on behalf of an administrator.
pub fn sweep_all_buckets(
    conn: &Connection,
    blobs: &dyn BlobStore,
    session: &SessionContext,
    grace: Duration,
) -> Result<Vec<SweepReport>, RecordError> {
    authorization::require(session, Capability::SweepBlobs)?;
    Bucket::ALL
        .iter()
        .map(|bucket| sweep_orphans(conn, blobs, *bucket, grace))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordTable, Role};
    use crate::records::attachments::{replace_doctor_image, AttachmentUpload};
    use crate::records::doctors::create_doctor;
    use crate::records::test_support::*;

    const NO_GRACE: Duration = Duration::ZERO;
    const HOUR: Duration = Duration::from_secs(3600);

    fn upload(bytes: &[u8]) -> AttachmentUpload<'_> {
        AttachmentUpload {
            file_name: Some("face.png"),
            content_type: None,
            bytes,
        }
    }

    #[test]
    fn removes_unreferenced_and_keeps_referenced() {
        let mut conn = setup();
        let (blobs, _dir) = blob_store();
        let admin = session(&conn, Role::Admin);
        let doctor = create_doctor(&mut conn, &admin, &jane_smith()).unwrap();
        let doctor = replace_doctor_image(&mut conn, &blobs, &admin, &doctor.id, upload(b"img"))
            .unwrap();
        blobs.upload(Bucket::DoctorImages, "stray.png", b"left behind").unwrap();

        let report = sweep_orphans(&conn, &blobs, Bucket::DoctorImages, NO_GRACE).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.removed, 1);
        assert_eq!(report.errors, 0);

        assert!(!blobs.exists(Bucket::DoctorImages, "stray.png").unwrap());
        let kept = doctor.image_path.unwrap();
        assert!(blobs.exists(Bucket::DoctorImages, &kept).unwrap());
    }

    #[test]
    fn recent_blobs_survive_the_grace_period() {
        let conn = setup();
        let (blobs, _dir) = blob_store();
        blobs.upload(Bucket::PatientReports, "in-flight.png", b"x").unwrap();

        let report = sweep_orphans(&conn, &blobs, Bucket::PatientReports, HOUR).unwrap();
        assert_eq!(report.scanned, 1);
        assert_eq!(report.removed, 0);
        assert!(blobs.exists(Bucket::PatientReports, "in-flight.png").unwrap());
    }

    #[test]
    fn rows_in_other_tables_do_not_protect_blobs() {
        let mut conn = setup();
        let (blobs, _dir) = blob_store();
        let admin = session(&conn, Role::Admin);
        let doctor = create_doctor(&mut conn, &admin, &jane_smith()).unwrap();
        blobs.upload(Bucket::PatientReports, "shared.png", b"x").unwrap();
        db::set_attachment(&conn, RecordTable::Doctors, &doctor.id, "u", "shared.png").unwrap();

        let report = sweep_orphans(&conn, &blobs, Bucket::PatientReports, NO_GRACE).unwrap();
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn sweeping_is_admin_only() {
        let conn = setup();
        let (blobs, _dir) = blob_store();
        let staff = session(&conn, Role::Staff);
        assert!(matches!(
            sweep_all_buckets(&conn, &blobs, &staff, NO_GRACE),
            Err(RecordError::Forbidden(_))
        ));

        let admin = session(&conn, Role::Admin);
        let reports = sweep_all_buckets(&conn, &blobs, &admin, NO_GRACE).unwrap();
        let buckets: Vec<_> = reports.iter().map(|r| r.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["doctor-images", "patient-reports"]);
    }
}
