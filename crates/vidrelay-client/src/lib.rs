//! Transfer client, download sinks, and the `vidrelay` command-line interface.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vidrelay_client::{MemorySink, TransferClient};
//!
//! # async fn example() -> vidrelay_client::ClientResult<()> {
//! let client = TransferClient::new("127.0.0.1:9999", Duration::from_secs(30));
//! let bytes = client.fetch_object("demo", "sample.mp4", MemorySink::new()).await?;
//! assert_eq!(bytes, b"HELLO WORLD!");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod sink;
pub mod socket;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use sink::{FileSink, MemorySink, Sink};
pub use socket::TransferClient;
