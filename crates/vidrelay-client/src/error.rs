//! Client error types.

use std::fmt;

use vidrelay_protocol::ProtocolError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Connection to server failed.
    Connection(String),
    /// Writing the request failed.
    Send(String),
    /// The server broke the framing rules.
    Protocol(String),
    /// The server closed the connection before sending the announced size.
    Truncated { received: u64, expected: u64 },
    /// The server has no such object.
    NotFound(String),
    /// The server answered with an error other than not found.
    Remote(String),
    /// A read, write, or connect exceeded its deadline.
    Timeout(String),
    /// IO error.
    Io(std::io::Error),
    /// The relay server failed to start or stopped with an error.
    Server(String),
}

impl ClientError {
    /// Returns true if the server reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Connection(msg) => write!(f, "connection error: {}", msg),
            Self::Send(msg) => write!(f, "failed to send request: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Truncated { received, expected } => write!(
                f,
                "transfer truncated: received {} of {} bytes",
                received, expected
            ),
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::Remote(msg) => write!(f, "server error: {}", msg),
            Self::Timeout(msg) => write!(f, "timeout: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Server(msg) => write!(f, "server error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::IncompleteMessage { expected, received } => {
                Self::Truncated { received, expected }
            }
            ProtocolError::Timeout { operation } => Self::Timeout(operation),
            ProtocolError::Io(e) => Self::Io(e),
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<vidrelay_core::CatalogError> for ClientError {
    fn from(err: vidrelay_core::CatalogError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<vidrelay_store::StoreError> for ClientError {
    fn from(err: vidrelay_store::StoreError) -> Self {
        Self::Config(format!("blob store: {}", err))
    }
}

impl From<vidrelay_server::ServerError> for ClientError {
    fn from(err: vidrelay_server::ServerError) -> Self {
        Self::Server(err.to_string())
    }
}
