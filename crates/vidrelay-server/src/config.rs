//! Server configuration.

use std::time::Duration;

use vidrelay_core::{DEFAULT_BUCKET, DEFAULT_LISTEN_ADDR};
use vidrelay_protocol::DEFAULT_CHUNK_SIZE;

use crate::error::{ServerError, ServerResult};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (`host:port`).
    pub listen_addr: String,

    /// Deadline for each read or write on a connection.
    pub connection_timeout: Duration,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Size of each payload write.
    pub chunk_size: usize,

    /// Bucket listed when `LIST` names none.
    pub default_bucket: String,

    /// How long shutdown waits for open connections to finish.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            connection_timeout: Duration::from_secs(30),
            max_connections: 100,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_bucket: DEFAULT_BUCKET.to_string(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration listening on `listen_addr`.
    pub fn new(listen_addr: impl Into<String>) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            ..Default::default()
        }
    }

    /// Builder: set connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Builder: set max connections.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Builder: set payload chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builder: set the default bucket.
    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = bucket.into();
        self
    }

    /// Builder: set the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Checks that every limit is usable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        if u32::try_from(self.max_connections).is_err() {
            return Err(ServerError::config("max_connections is too large"));
        }
        if self.chunk_size == 0 {
            return Err(ServerError::config("chunk_size must be at least 1"));
        }
        if self.connection_timeout.is_zero() {
            return Err(ServerError::config("connection_timeout must be non-zero"));
        }
        if self.default_bucket.is_empty() || self.default_bucket.contains(char::is_whitespace) {
            return Err(ServerError::config(format!(
                "invalid default bucket `{}`",
                self.default_bucket
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:9999");
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 100);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.default_bucket, "videos");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("127.0.0.1:0")
            .with_connection_timeout(Duration::from_secs(60))
            .with_max_connections(50)
            .with_chunk_size(1024)
            .with_default_bucket("A_Server")
            .with_shutdown_timeout(Duration::from_secs(5));

        assert_eq!(config.listen_addr, "127.0.0.1:0");
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.default_bucket, "A_Server");
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert!(ServerConfig::default().with_max_connections(0).validate().is_err());
        assert!(ServerConfig::default().with_chunk_size(0).validate().is_err());
        assert!(
            ServerConfig::default()
                .with_connection_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(ServerConfig::default().with_default_bucket("a b").validate().is_err());
    }
}
