//! `vidrelay serve`: runs the relay server in the foreground.

use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Command-line overrides for the `[server]` section.
#[derive(Debug, Default)]
pub struct ServeOverrides {
    pub listen: Option<String>,
    pub max_connections: Option<usize>,
    pub default_bucket: Option<String>,
}

/// Builds the store and serves until SIGINT or SIGTERM.
pub async fn run(config: &ClientConfig, overrides: ServeOverrides) -> ClientResult<()> {
    let mut server_config = config.server.to_server_config();
    if let Some(listen) = overrides.listen {
        server_config.listen_addr = listen;
    }
    if let Some(max) = overrides.max_connections {
        server_config.max_connections = max;
    }
    if let Some(bucket) = overrides.default_bucket {
        server_config.default_bucket = bucket;
    }

    let store_config = config.resolved_store()?;
    info!(backend = store_config.backend_name(), "Building blob store");
    let store = store_config.build()?;

    vidrelay_server::serve(server_config, store).await?;
    Ok(())
}
