//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

use vidrelay_core::TracingConfig;

/// vidrelay - fetch videos from a relay server
#[derive(Debug, Parser)]
#[command(name = "vidrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "VIDRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Relay server address (host:port)
    #[arg(long, global = true, env = "VIDRELAY_ADDRESS")]
    pub address: Option<String>,

    /// Connection timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Picks the tracing preset for the command.
    ///
    /// Debug output is on when either `--debug` or the config file's
    /// `debug` key asks for it.
    pub fn tracing_config(&self, config_debug: bool) -> TracingConfig {
        let debug = self.debug || config_debug;
        match (&self.command, debug) {
            (Command::Serve { .. }, false) => TracingConfig::server(),
            (Command::Serve { .. }, true) => TracingConfig::server().with_level(Level::DEBUG),
            (_, false) => TracingConfig::client(),
            (_, true) => TracingConfig::client_debug(),
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the relay server in the foreground
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,

        /// Maximum concurrent connections
        #[arg(long)]
        max_connections: Option<usize>,

        /// Bucket listed when a request names none
        #[arg(long)]
        default_bucket: Option<String>,
    },

    /// List the objects in a bucket
    List {
        /// Bucket to list (the server's default bucket if omitted)
        bucket: Option<String>,
    },

    /// Download an object
    Fetch {
        /// Bucket holding the object
        bucket: String,

        /// Storage name of the object
        #[arg(required_unless_present = "title")]
        object: Option<String>,

        /// Look the object up in the catalog by its display name
        #[arg(long, conflicts_with = "object")]
        title: Option<String>,

        /// Directory receiving the downloaded file
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Write the payload to stdout instead of a file
        #[arg(long, conflicts_with = "output_dir")]
        stdout: bool,
    },

    /// Video catalog commands
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Catalog actions.
#[derive(Debug, Subcommand)]
pub enum CatalogAction {
    /// Register a display name for a stored object
    Add {
        /// Bucket holding the object
        bucket: String,
        /// Storage name of the object
        storage_name: String,
        /// Title shown to users
        display_name: String,
    },

    /// List the display names in a bucket
    List {
        /// Bucket to list
        bucket: String,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
