//! Filesystem blob store: `<root>/<bucket>/<path>`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;

use super::{validate_blob_path, BlobInfo, BlobStore, StorageError};
use crate::models::Bucket;

pub struct FilesystemBlobStore {
    root: PathBuf,
    /// e.g. `http://127.0.0.1:8710`; URLs are `<base>/blobs/<bucket>/<path>`.
    public_base_url: String,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.as_str())
    }

    fn blob_path(&self, bucket: Bucket, path: &str) -> Result<PathBuf, StorageError> {
        validate_blob_path(path)?;
        Ok(self.bucket_dir(bucket).join(path))
    }
}

impl BlobStore for FilesystemBlobStore {
    fn upload(&self, bucket: Bucket, path: &str, content: &[u8]) -> Result<(), StorageError> {
        let target = self.blob_path(bucket, path)?;
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir)?;

        // Write beside the target, then link into place, so readers never
        // observe a partially written blob.
        let mut staged = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&dir)?;
        staged.write_all(content)?;
        staged.as_file().sync_all()?;
        staged.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(path.to_string())
            } else {
                StorageError::Io(e.error)
            }
        })?;

        tracing::debug!(bucket = %bucket, path, bytes = content.len(), "Blob stored");
        Ok(())
    }

    fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError> {
        let target = self.blob_path(bucket, path)?;
        secure_delete_file(&target)?;
        tracing::debug!(bucket = %bucket, path, "Blob removed");
        Ok(())
    }

    fn exists(&self, bucket: Bucket, path: &str) -> Result<bool, StorageError> {
        Ok(self.blob_path(bucket, path)?.is_file())
    }

    fn list(&self, bucket: Bucket) -> Result<Vec<BlobInfo>, StorageError> {
        let entries = match fs::read_dir(self.bucket_dir(bucket)) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut blobs = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staged uploads start with a dot and are not blobs yet.
            if validate_blob_path(&name).is_err() {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            blobs.push(BlobInfo {
                path: name,
                size: metadata.len(),
                modified: metadata.modified()?,
            });
        }
        Ok(blobs)
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/blobs/{}/{}", self.public_base_url, bucket.as_str(), path)
    }
}

/// Overwrite a file with random bytes, sync, then remove it.
///
/// Attachments include medical report scans, so content is scrubbed before
/// the directory entry goes away. Missing files are not an error.
pub fn secure_delete_file(path: &Path) -> std::io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let file_size = metadata.len() as usize;

    if file_size > 0 {
        let mut random_buf = vec![0u8; file_size.min(64 * 1024)];
        let mut file = fs::OpenOptions::new().write(true).open(path)?;

        let mut remaining = file_size;
        while remaining > 0 {
            let chunk_size = remaining.min(random_buf.len());
            OsRng.fill_bytes(&mut random_buf[..chunk_size]);
            if let Err(e) = file.write_all(&random_buf[..chunk_size]) {
                tracing::warn!(path = %path.display(), "Secure overwrite failed: {e}");
                break;
            }
            remaining -= chunk_size;
        }

        if let Err(e) = file.sync_all() {
            tracing::warn!(path = %path.display(), "Sync after overwrite failed: {e}");
        }
    }

    match fs::remove_file(path) {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (FilesystemBlobStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path(), "http://localhost:8710/");
        (store, dir)
    }

    #[test]
    fn upload_then_list_and_exists() {
        let (store, _dir) = store();
        store.upload(Bucket::DoctorImages, "a.png", b"png-bytes").unwrap();

        assert!(store.exists(Bucket::DoctorImages, "a.png").unwrap());
        assert!(!store.exists(Bucket::PatientReports, "a.png").unwrap());

        let listed = store.list(Bucket::DoctorImages).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "a.png");
        assert_eq!(listed[0].size, 9);
    }

    #[test]
    fn upload_never_overwrites() {
        let (store, _dir) = store();
        store.upload(Bucket::DoctorImages, "a.png", b"first").unwrap();
        let err = store.upload(Bucket::DoctorImages, "a.png", b"second").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        let on_disk = fs::read(store.root().join("doctor-images").join("a.png")).unwrap();
        assert_eq!(on_disk, b"first");
    }

    #[test]
    fn remove_is_idempotent() {
        let (store, _dir) = store();
        store.upload(Bucket::PatientReports, "r.jpg", b"scan").unwrap();
        store.remove(Bucket::PatientReports, "r.jpg").unwrap();
        assert!(!store.exists(Bucket::PatientReports, "r.jpg").unwrap());
        store.remove(Bucket::PatientReports, "r.jpg").unwrap();
    }

    #[test]
    fn list_of_empty_bucket_is_empty() {
        let (store, _dir) = store();
        assert!(store.list(Bucket::PatientReports).unwrap().is_empty());
    }

    #[test]
    fn traversal_is_rejected_before_touching_disk() {
        let (store, _dir) = store();
        let err = store.upload(Bucket::DoctorImages, "../escape.png", b"x").unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[test]
    fn public_url_includes_bucket() {
        let (store, _dir) = store();
        assert_eq!(
            store.public_url(Bucket::DoctorImages, "a.png"),
            "http://localhost:8710/blobs/doctor-images/a.png"
        );
    }
}
