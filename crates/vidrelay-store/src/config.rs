//! Store backend selection.
//!
//! The `[store]` section of `config.toml` deserializes into [`StoreConfig`]:
//!
//! ```toml
//! [store]
//! backend = "local"
//! root = "/srv/videos"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreResult;
use crate::local::LocalBlobStore;
use crate::memory::MemoryBlobStore;
use crate::store::BlobStore;

/// Which backend to use and how to reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Empty in-memory store.
    #[default]
    Memory,

    /// Directory tree on the local filesystem.
    Local {
        /// Root directory; each subdirectory is a bucket.
        root: PathBuf,
    },

    /// Remote storage REST service.
    Http {
        /// Project base URL.
        url: String,
        /// API key (supports `pass::` and `env::` prefixes in config files).
        api_key: String,
        /// Request timeout in seconds.
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

impl StoreConfig {
    /// Returns the backend name.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local { .. } => "local",
            Self::Http { .. } => "http",
        }
    }

    /// Builds the configured store.
    ///
    /// Secret references must already be resolved.
    pub fn build(&self) -> StoreResult<Arc<dyn BlobStore>> {
        match self {
            Self::Memory => {
                warn!("Using an empty in-memory store; every fetch will fail");
                Ok(Arc::new(MemoryBlobStore::new()))
            }
            Self::Local { root } => Ok(Arc::new(LocalBlobStore::new(root)?)),
            Self::Http {
                url,
                api_key,
                timeout_secs,
            } => build_http(url, api_key, *timeout_secs),
        }
    }
}

#[cfg(feature = "http")]
fn build_http(url: &str, api_key: &str, timeout_secs: u64) -> StoreResult<Arc<dyn BlobStore>> {
    use crate::http::{HttpBlobStore, HttpStoreConfig};

    let config = HttpStoreConfig::new(url, api_key)?
        .with_timeout(std::time::Duration::from_secs(timeout_secs));
    Ok(Arc::new(HttpBlobStore::new(config)?))
}

#[cfg(not(feature = "http"))]
fn build_http(_url: &str, _api_key: &str, _timeout_secs: u64) -> StoreResult<Arc<dyn BlobStore>> {
    Err(crate::error::StoreError::configuration(
        "the http store backend was not compiled in (enable the `http` feature)",
    ))
}
