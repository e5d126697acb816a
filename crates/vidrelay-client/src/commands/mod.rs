//! Subcommand implementations.

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod list;
pub mod serve;

use std::time::Duration;

use crate::cli::Cli;
use crate::config::ClientConfig;
use crate::socket::TransferClient;

/// Builds a transfer client, letting CLI flags override the config file.
pub fn transfer_client(cli: &Cli, config: &ClientConfig) -> TransferClient {
    let address = cli
        .address
        .clone()
        .unwrap_or_else(|| config.client.address.clone());
    let timeout = cli.timeout.unwrap_or(config.client.timeout);
    TransferClient::new(address, Duration::from_secs(timeout))
}
