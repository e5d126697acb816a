//! Error types for blob store operations.
//!
//! The server translates these into opaque wire errors, so the message
//! carried here may include backend detail that never reaches a client.

use std::fmt;
use thiserror::Error;

/// The category of a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    /// The bucket or object does not exist.
    NotFound,
    /// Network error talking to the backing service.
    NetworkError,
    /// The backing service returned an error or an unexpected response.
    BackendError,
    /// The bucket or object name cannot be used with this backend.
    InvalidName,
    /// Missing or invalid backend configuration.
    ConfigurationError,
}

impl StoreErrorCode {
    /// Returns a machine-friendly name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NetworkError => "network_error",
            Self::BackendError => "backend_error",
            Self::InvalidName => "invalid_name",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error returned by a [`BlobStore`](crate::BlobStore).
#[derive(Debug, Error)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    /// The backend that generated this error (e.g., "local", "http").
    backend: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Creates a new store error with the given code and message.
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            backend: None,
            source: None,
        }
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NotFound, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::NetworkError, message)
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::BackendError, message)
    }

    /// Creates an invalid name error.
    pub fn invalid_name(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::InvalidName, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::ConfigurationError, message)
    }

    /// Sets the backend name for this error.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the backend name, if set.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Returns true if the bucket or object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == StoreErrorCode::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref backend) = self.backend {
            write!(f, "[{}] ", backend)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
