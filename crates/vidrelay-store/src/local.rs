//! Local filesystem blob store.
//!
//! Buckets are directories directly below the root; objects are regular
//! files inside them:
//!
//! ```text
//! <root>/
//!   demo/
//!     sample.mp4
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{BlobStore, BoxFuture, validate_name};

const BACKEND: &str = "local";

/// A [`BlobStore`] backed by a directory tree.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root`.
    ///
    /// The directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::configuration(format!(
                "storage root {} is not a directory",
                root.display()
            ))
            .with_backend(BACKEND));
        }

        info!(root = %root.display(), "Local blob store ready");
        Ok(Self { root })
    }

    /// Returns the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> StoreResult<PathBuf> {
        validate_name("bucket", bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, object: &str) -> StoreResult<PathBuf> {
        validate_name("object", object)?;
        Ok(self.bucket_path(bucket)?.join(object))
    }

    async fn read_object(&self, bucket: &str, object: &str) -> StoreResult<Bytes> {
        let path = self.object_path(bucket, object)?;
        let start = std::time::Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                StoreError::not_found(format!("object `{}/{}`", bucket, object))
            }
            _ => StoreError::backend(format!("failed to read {}", path.display())).with_source(e),
        })?;

        debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store fetch"
        );

        Ok(Bytes::from(data))
    }

    async fn read_bucket(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let path = self.bucket_path(bucket)?;

        let mut entries = fs::read_dir(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::not_found(format!("bucket `{}`", bucket)),
            _ => StoreError::backend(format!("failed to list {}", path.display())).with_source(e),
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::backend("failed to read directory entry").with_source(e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| StoreError::backend("failed to stat directory entry").with_source(e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && validate_name("object", name).is_ok()
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

impl BlobStore for LocalBlobStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn fetch<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, StoreResult<Bytes>> {
        Box::pin(async move {
            self.read_object(bucket, object)
                .await
                .map_err(|e| e.with_backend(BACKEND))
        })
    }

    fn list<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move {
            self.read_bucket(bucket)
                .await
                .map_err(|e| e.with_backend(BACKEND))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorCode;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempdir().unwrap();
        let bucket = dir.path().join("demo");
        std::fs::create_dir(&bucket).unwrap();
        std::fs::write(bucket.join("sample.mp4"), b"HELLO WORLD!").unwrap();
        std::fs::write(bucket.join("b.mp4"), b"").unwrap();
        std::fs::write(bucket.join(".hidden"), b"x").unwrap();
        std::fs::create_dir(bucket.join("subdir")).unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();

        let store = LocalBlobStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn new_requires_directory() {
        let err = LocalBlobStore::new("/definitely/not/a/real/dir").unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn fetch_reads_file() {
        let (_dir, store) = fixture();
        let data = store.fetch("demo", "sample.mp4").await.unwrap();
        assert_eq!(&data[..], b"HELLO WORLD!");

        let empty = store.fetch("demo", "b.mp4").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let (_dir, store) = fixture();
        let err = store.fetch("demo", "nope.mp4").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.backend_name(), Some("local"));
    }

    #[tokio::test]
    async fn fetch_rejects_traversal() {
        let (_dir, store) = fixture();
        let err = store.fetch("demo", "../demo").await.unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::InvalidName);
        let err = store.fetch("..", "sample.mp4").await.unwrap_err();
        assert_eq!(err.code(), StoreErrorCode::InvalidName);
    }

    #[tokio::test]
    async fn list_skips_dirs_and_hidden_files() {
        let (_dir, store) = fixture();
        let names = store.list("demo").await.unwrap();
        assert_eq!(names, vec!["b.mp4", "sample.mp4"]);
    }

    #[tokio::test]
    async fn list_empty_and_missing_bucket() {
        let (_dir, store) = fixture();
        assert!(store.list("empty").await.unwrap().is_empty());
        assert!(store.list("missing").await.unwrap_err().is_not_found());
    }
}
