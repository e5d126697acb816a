//! vidrelay CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use vidrelay_core::init_tracing;

use vidrelay_client::cli::{CatalogAction, Cli, Command, ConfigAction};
use vidrelay_client::commands::{self, fetch, serve};
use vidrelay_client::config::ClientConfig;
use vidrelay_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(cli.tracing_config(config.debug)) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);

    let client = commands::transfer_client(&cli, &config);

    match cli.command {
        Command::Serve {
            listen,
            max_connections,
            default_bucket,
        } => {
            let overrides = serve::ServeOverrides {
                listen,
                max_connections,
                default_bucket,
            };
            serve::run(&config, overrides).await
        }
        Command::List { bucket } => commands::list::run(&client, bucket.as_deref()).await,
        Command::Fetch {
            bucket,
            object,
            title,
            output_dir,
            stdout,
        } => {
            let target = match (object, title) {
                (_, Some(title)) => fetch::Target::Title(title),
                (Some(object), None) => fetch::Target::Object(object),
                (None, None) => {
                    return Err(ClientError::Config(
                        "fetch needs an object name or --title".into(),
                    ));
                }
            };
            let destination = if stdout {
                fetch::Destination::Stdout
            } else {
                fetch::Destination::Dir(output_dir.unwrap_or_else(|| config.client.download_dir()))
            };
            fetch::run(&client, &config, &bucket, target, destination).await
        }
        Command::Catalog { action } => match action {
            CatalogAction::Add {
                bucket,
                storage_name,
                display_name,
            } => commands::catalog::add(&config, bucket, storage_name, display_name),
            CatalogAction::List { bucket } => commands::catalog::list(&config, &bucket),
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config, &config_path),
        },
    }
}
