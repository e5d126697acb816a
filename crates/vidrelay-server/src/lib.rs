//! Relay server: TCP listener, connection handling, blob dispatch.
//!
//! Each connection carries one request line (`LIST [bucket]` or
//! `GET <bucket> <object>`) and receives one framed response. Object bytes come
//! from a [`BlobStore`] shared by all connections.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vidrelay_server::{ServerConfig, serve};
//! use vidrelay_store::MemoryBlobStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryBlobStore::new().with_object("demo", "sample.mp4", "HELLO WORLD!")?;
//!     serve(ServerConfig::new("127.0.0.1:9999"), Arc::new(store)).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod signals;
mod socket;

use std::future::Future;
use std::sync::Arc;

use tracing::info;
use vidrelay_store::BlobStore;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{Reply, RequestHandler, make_connection_handler};
pub use signals::{ShutdownHandle, ShutdownSignal, SignalHandler};
pub use socket::{Connection, TransferServer};

/// Binds `config.listen_addr` and serves until SIGINT or SIGTERM.
///
/// Fails fast with [`ServerError::Bind`] if the address is unavailable.
pub async fn serve(config: ServerConfig, store: Arc<dyn BlobStore>) -> ServerResult<()> {
    let signals = SignalHandler::new();
    signals.spawn_listener();
    serve_until_shutdown(config, store, signals.shutdown().wait()).await
}

/// Binds `config.listen_addr` and serves until `shutdown` completes.
pub async fn serve_until_shutdown<S>(
    config: ServerConfig,
    store: Arc<dyn BlobStore>,
    shutdown: S,
) -> ServerResult<()>
where
    S: Future<Output = ()> + Send,
{
    let server = TransferServer::bind(config).await?;
    info!(backend = store.name(), "Serving blob store");

    let handler = make_connection_handler(store, server.config().default_bucket.clone());
    server.run_until_shutdown(handler, shutdown).await?;

    info!("Server stopped");
    Ok(())
}
