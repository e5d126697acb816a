//! BlobStore trait and implementations (memory, local filesystem, HTTP).
//!
//! The relay server reaches its backing object store exclusively through the
//! [`BlobStore`] trait. Backends:
//!
//! - [`MemoryBlobStore`]: in-process map, for tests and demos
//! - [`LocalBlobStore`]: one directory per bucket
//! - [`HttpBlobStore`]: Supabase-style storage REST API (feature `http`)
//!
//! # Example
//!
//! ```rust
//! use vidrelay_store::{BlobStore, MemoryBlobStore};
//!
//! let store = MemoryBlobStore::new().with_object("demo", "sample.mp4", "HELLO WORLD!")?;
//! assert_eq!(store.name(), "memory");
//! # Ok::<(), vidrelay_store::StoreError>(())
//! ```

mod config;
mod error;
#[cfg(feature = "http")]
pub mod http;
mod local;
mod memory;
mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreErrorCode, StoreResult};
#[cfg(feature = "http")]
pub use http::{HttpBlobStore, HttpStoreConfig};
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use store::{BlobStore, BoxFuture, validate_name};
