//! In-memory blob store.
//!
//! Useful for tests and demos. Buckets must be created (explicitly or by
//! inserting an object) before they can be listed.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{BlobStore, BoxFuture, validate_name};

const BACKEND: &str = "memory";

/// A [`BlobStore`] holding every object in memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    /// Creates an empty store with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bucket. Existing buckets are left untouched.
    pub fn create_bucket(&self, bucket: impl Into<String>) -> StoreResult<()> {
        let bucket = bucket.into();
        validate_name("bucket", &bucket)?;
        self.buckets
            .write()
            .map_err(|_| poisoned())?
            .entry(bucket)
            .or_default();
        Ok(())
    }

    /// Stores an object, creating the bucket if needed.
    pub fn insert(
        &self,
        bucket: impl Into<String>,
        object: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> StoreResult<()> {
        let bucket = bucket.into();
        let object = object.into();
        validate_name("bucket", &bucket)?;
        validate_name("object", &object)?;

        self.buckets
            .write()
            .map_err(|_| poisoned())?
            .entry(bucket)
            .or_default()
            .insert(object, data.into());
        Ok(())
    }

    /// Builder: store an object, creating the bucket if needed.
    pub fn with_object(
        self,
        bucket: impl Into<String>,
        object: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> StoreResult<Self> {
        self.insert(bucket, object, data)?;
        Ok(self)
    }

    fn get(&self, bucket: &str, object: &str) -> StoreResult<Bytes> {
        let buckets = self.buckets.read().map_err(|_| poisoned())?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::not_found(format!("bucket `{}`", bucket)))?;
        objects
            .get(object)
            .cloned()
            .ok_or_else(|| StoreError::not_found(format!("object `{}/{}`", bucket, object)))
    }

    fn names(&self, bucket: &str) -> StoreResult<Vec<String>> {
        let buckets = self.buckets.read().map_err(|_| poisoned())?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::not_found(format!("bucket `{}`", bucket)))?;
        Ok(objects.keys().cloned().collect())
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("memory store lock poisoned")
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn fetch<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, StoreResult<Bytes>> {
        Box::pin(async move {
            let data = self
                .get(bucket, object)
                .map_err(|e| e.with_backend(BACKEND))?;
            debug!(bucket, object, size_bytes = data.len(), "Memory store fetch");
            Ok(data)
        })
    }

    fn list<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move { self.names(bucket).map_err(|e| e.with_backend(BACKEND)) })
    }
}
