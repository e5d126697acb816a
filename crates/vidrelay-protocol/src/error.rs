//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request line could not be parsed.
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// The peer sent bytes that do not follow the response framing.
    #[error("protocol violation: {reason}")]
    Violation { reason: String },

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u64, max: u64 },

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection closed before the full message was received.
    #[error("incomplete message: expected {expected} bytes, got {received}")]
    IncompleteMessage { expected: u64, received: u64 },

    /// Operation timed out.
    #[error("timeout during {operation}")]
    Timeout { operation: String },
}

impl ProtocolError {
    /// Creates a malformed request error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Creates a protocol violation error.
    pub fn violation(reason: impl Into<String>) -> Self {
        Self::Violation {
            reason: reason.into(),
        }
    }

    /// Creates a timeout error for the named operation.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }
}
