//! BlobStore trait definition.
//!
//! This module defines the [`BlobStore`] trait, the adapter the relay server
//! uses to reach the backing object store. Implementations return whole
//! objects as [`Bytes`]; the server is responsible for streaming them out.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Access to a bucketed object store.
///
/// Implementations must be `Send + Sync`: one instance is shared read-only by
/// every connection handler, and any internal state must be synchronized by
/// the implementation itself.
pub trait BlobStore: Send + Sync {
    /// Returns the backend name (e.g., "memory", "local", "http").
    fn name(&self) -> &str;

    /// Fetches the full content of `object` in `bucket`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] with code `NotFound` if the bucket or object
    /// does not exist, or another code if the backend failed.
    fn fetch<'a>(&'a self, bucket: &'a str, object: &'a str) -> BoxFuture<'a, StoreResult<Bytes>>;

    /// Lists object names in `bucket`, sorted by name.
    ///
    /// An existing bucket with no objects yields an empty vector.
    fn list<'a>(&'a self, bucket: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>>;
}

/// Rejects names that are empty, contain path separators, or could escape a
/// bucket (`.`, `..`, leading dots).
pub fn validate_name(kind: &str, name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::invalid_name(format!("{} name is empty", kind)));
    }
    if name.starts_with('.') {
        return Err(StoreError::invalid_name(format!(
            "{} name `{}` must not start with `.`",
            kind, name
        )));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
    {
        return Err(StoreError::invalid_name(format!(
            "{} name `{}` contains an invalid character",
            kind, name
        )));
    }
    Ok(())
}
