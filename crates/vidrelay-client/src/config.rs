//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/vidrelay/config.toml` by default:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:9999"
//! default_bucket = "videos"
//!
//! [client]
//! address = "relay.example.com:9999"
//! download_dir = "/tmp/videos"
//!
//! [store]
//! backend = "http"
//! url = "https://project.supabase.co"
//! api_key = "env::SUPABASE_KEY"
//! ```
//!
//! `store.api_key` supports secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use vidrelay_core::{DEFAULT_BUCKET, DEFAULT_LISTEN_ADDR, DEFAULT_SERVER_ADDR};
use vidrelay_server::ServerConfig;
use vidrelay_store::StoreConfig;

use crate::error::{ClientError, ClientResult};

/// Configuration for the vidrelay CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug output, same as `--debug`.
    pub debug: bool,

    /// Settings for `vidrelay serve`.
    pub server: ServerSettings,

    /// Settings for talking to a relay server.
    pub client: ClientSettings,

    /// Blob store served by `vidrelay serve`.
    pub store: StoreConfig,

    /// Video catalog settings.
    pub catalog: CatalogSettings,
}

/// Relay server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to listen on.
    pub listen: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Per-operation connection timeout in seconds.
    pub connection_timeout: u64,

    /// Size of each payload write in bytes.
    pub chunk_size: usize,

    /// Bucket listed when `LIST` names none.
    pub default_bucket: String,

    /// Seconds shutdown waits for open connections.
    pub shutdown_timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            listen: DEFAULT_LISTEN_ADDR.to_string(),
            max_connections: defaults.max_connections,
            connection_timeout: defaults.connection_timeout.as_secs(),
            chunk_size: defaults.chunk_size,
            default_bucket: DEFAULT_BUCKET.to_string(),
            shutdown_timeout: defaults.shutdown_timeout.as_secs(),
        }
    }
}

impl ServerSettings {
    /// Converts to the server's configuration.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(&self.listen)
            .with_max_connections(self.max_connections)
            .with_connection_timeout(Duration::from_secs(self.connection_timeout))
            .with_chunk_size(self.chunk_size)
            .with_default_bucket(&self.default_bucket)
            .with_shutdown_timeout(Duration::from_secs(self.shutdown_timeout))
    }
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Server address (`host:port`).
    pub address: String,

    /// Connection timeout in seconds.
    pub timeout: u64,

    /// Directory receiving downloaded files (defaults to the system temp dir).
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_SERVER_ADDR.to_string(),
            timeout: 30,
            download_dir: None,
        }
    }
}

impl ClientSettings {
    /// Returns the download directory.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Catalog settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Path to the catalog file.
    pub path: Option<PathBuf>,
}

impl CatalogSettings {
    /// Returns the catalog path, defaulting to the data directory.
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("catalog.toml"))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidrelay")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidrelay")
    }

    /// Returns the store configuration with secret references resolved.
    pub fn resolved_store(&self) -> ClientResult<StoreConfig> {
        match &self.store {
            StoreConfig::Http {
                url,
                api_key,
                timeout_secs,
            } => {
                let api_key = crate::secret::resolve(api_key).map_err(|e| {
                    ClientError::Config(format!("failed to resolve store.api_key: {}", e))
                })?;
                Ok(StoreConfig::Http {
                    url: url.clone(),
                    api_key,
                    timeout_secs: *timeout_secs,
                })
            }
            other => Ok(other.clone()),
        }
    }

    /// Checks values that deserialization alone cannot.
    pub fn validate(&self) -> ClientResult<()> {
        self.server
            .to_server_config()
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;

        if self.client.address.is_empty() {
            return Err(ClientError::Config("client.address must not be empty".into()));
        }
        if self.client.timeout == 0 {
            return Err(ClientError::Config("client.timeout must be positive".into()));
        }
        if let StoreConfig::Local { root } = &self.store
            && !root.is_dir()
        {
            return Err(ClientError::Config(format!(
                "store.root {} is not a directory",
                root.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.client.address, "127.0.0.1:9999");
        assert_eq!(config.server.listen, "0.0.0.0:9999");
        assert_eq!(config.server.default_bucket, "videos");
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn parses_all_sections() {
        let toml_content = r#"
debug = true

[server]
listen = "127.0.0.1:7000"
max_connections = 4
default_bucket = "A_Server"
shutdown_timeout = 5

[client]
address = "relay:7000"
timeout = 10
download_dir = "/tmp/dl"

[store]
backend = "local"
root = "/srv/videos"

[catalog]
path = "/tmp/catalog.toml"
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        assert!(config.debug);

        let server = config.server.to_server_config();
        assert_eq!(server.listen_addr, "127.0.0.1:7000");
        assert_eq!(server.max_connections, 4);
        assert_eq!(server.default_bucket, "A_Server");
        assert_eq!(server.connection_timeout, Duration::from_secs(30));
        assert_eq!(server.shutdown_timeout, Duration::from_secs(5));

        assert_eq!(config.client.download_dir(), PathBuf::from("/tmp/dl"));
        assert_eq!(
            config.store,
            StoreConfig::Local {
                root: PathBuf::from("/srv/videos")
            }
        );
        assert_eq!(config.catalog.path(), PathBuf::from("/tmp/catalog.toml"));
    }

    #[test]
    fn resolves_api_key_from_env() {
        unsafe {
            std::env::set_var("_VIDRELAY_TEST_STORE_KEY", "service-key");
        }

        let toml_content = r#"
[store]
backend = "http"
url = "https://project.supabase.co"
api_key = "env::_VIDRELAY_TEST_STORE_KEY"
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();
        let resolved = config.resolved_store().unwrap();
        assert_eq!(
            resolved,
            StoreConfig::Http {
                url: "https://project.supabase.co".into(),
                api_key: "service-key".into(),
                timeout_secs: 30,
            }
        );

        unsafe {
            std::env::remove_var("_VIDRELAY_TEST_STORE_KEY");
        }
    }

    #[test]
    fn unresolvable_api_key_errors() {
        let config = ClientConfig {
            store: StoreConfig::Http {
                url: "https://project.supabase.co".into(),
                api_key: "env::_VIDRELAY_NONEXISTENT_VAR_12345".into(),
                timeout_secs: 30,
            },
            ..Default::default()
        };
        let err = config.resolved_store().unwrap_err();
        assert!(err.to_string().contains("store.api_key"));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        assert!(config.validate().is_ok());

        config.server.max_connections = 0;
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));

        let config = ClientConfig {
            store: StoreConfig::Local {
                root: PathBuf::from("/definitely/not/a/real/dir"),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\ntimeout = \"soon\"\n").unwrap();

        let err = ClientConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
