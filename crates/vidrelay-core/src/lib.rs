//! Shared defaults, tracing setup, and the video catalog.

pub mod catalog;
pub mod tracing;

pub use catalog::{Catalog, CatalogEntry, CatalogError, CatalogResult};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

/// Default address the server listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:9999";

/// Default address clients connect to.
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:9999";

/// Default bucket served for `LIST` without an explicit bucket.
pub const DEFAULT_BUCKET: &str = "videos";
