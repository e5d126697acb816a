//! Request and response types for the vidrelay protocol.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};
use crate::{ERROR_PREFIX, MAX_REQUEST_LINE};

/// Request sent from client to server, one per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// List object names in a bucket.
    List {
        /// Bucket to list; `None` means the server's default bucket.
        bucket: Option<String>,
    },

    /// Fetch the bytes of one object.
    Get {
        /// Bucket holding the object.
        bucket: String,
        /// Object name within the bucket.
        object: String,
    },
}

impl Request {
    /// Creates a List request for the server's default bucket.
    pub fn list() -> Self {
        Self::List { bucket: None }
    }

    /// Creates a List request for a named bucket.
    pub fn list_bucket(bucket: impl Into<String>) -> Self {
        Self::List {
            bucket: Some(bucket.into()),
        }
    }

    /// Creates a Get request.
    pub fn get(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Get {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Returns the verb used on the wire.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::List { .. } => "LIST",
            Self::Get { .. } => "GET",
        }
    }

    /// Parses a request line.
    ///
    /// The line must not include the `\n` terminator; a single trailing `\r`
    /// is tolerated. Tokens are separated by exactly one space.
    pub fn parse_line(line: &str) -> ProtocolResult<Self> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.len() > MAX_REQUEST_LINE {
            return Err(ProtocolError::malformed(format!(
                "request line too long: {} bytes (max: {})",
                line.len(),
                MAX_REQUEST_LINE
            )));
        }

        if line.is_empty() {
            return Err(ProtocolError::malformed("empty request line"));
        }

        let tokens: Vec<&str> = line.split(' ').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(ProtocolError::malformed(
                "tokens must be separated by exactly one space",
            ));
        }

        let request = match tokens.as_slice() {
            ["LIST"] => Self::list(),
            ["LIST", bucket] => Self::list_bucket(*bucket),
            ["GET", bucket, object] => Self::get(*bucket, *object),
            ["LIST", ..] => {
                return Err(ProtocolError::malformed("LIST takes at most one argument"));
            }
            ["GET", ..] => {
                return Err(ProtocolError::malformed(
                    "GET takes exactly two arguments: <bucket> <object>",
                ));
            }
            [verb, ..] => {
                return Err(ProtocolError::malformed(format!("unknown verb `{}`", verb)));
            }
            [] => return Err(ProtocolError::malformed("empty request line")),
        };

        request.validate()?;
        Ok(request)
    }

    /// Checks the name invariants of this request.
    pub fn validate(&self) -> ProtocolResult<()> {
        match self {
            Self::List { bucket: None } => Ok(()),
            Self::List {
                bucket: Some(bucket),
            } => validate_name("bucket", bucket),
            Self::Get { bucket, object } => {
                validate_name("bucket", bucket)?;
                validate_name("object", object)
            }
        }
    }

    /// Encodes the request as a newline-terminated line.
    pub fn encode_line(&self) -> ProtocolResult<Vec<u8>> {
        self.validate()?;
        let line = self.to_string();
        if line.len() > MAX_REQUEST_LINE {
            return Err(ProtocolError::malformed(format!(
                "request line too long: {} bytes (max: {})",
                line.len(),
                MAX_REQUEST_LINE
            )));
        }

        let mut buffer = Vec::with_capacity(line.len() + 1);
        buffer.extend_from_slice(line.as_bytes());
        buffer.push(b'\n');
        Ok(buffer)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { bucket: None } => write!(f, "LIST"),
            Self::List {
                bucket: Some(bucket),
            } => write!(f, "LIST {}", bucket),
            Self::Get { bucket, object } => write!(f, "GET {} {}", bucket, object),
        }
    }
}

fn validate_name(field: &str, value: &str) -> ProtocolResult<()> {
    if value.is_empty() {
        return Err(ProtocolError::malformed(format!("{} must not be empty", field)));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ProtocolError::malformed(format!(
            "{} must not contain whitespace or control characters",
            field
        )));
    }
    Ok(())
}

/// Kind tag carried in the first byte of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Raw object bytes.
    Payload,
    /// Comma-joined object names.
    Listing,
    /// `ERROR: `-prefixed text.
    Error,
}

impl ResponseKind {
    /// Returns the tag byte for this kind.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Payload => b'P',
            Self::Listing => b'L',
            Self::Error => b'E',
        }
    }

    /// Parses a tag byte.
    pub fn from_byte(byte: u8) -> ProtocolResult<Self> {
        match byte {
            b'P' => Ok(Self::Payload),
            b'L' => Ok(Self::Listing),
            b'E' => Ok(Self::Error),
            other => Err(ProtocolError::violation(format!(
                "unknown response kind 0x{:02x}",
                other
            ))),
        }
    }
}

/// Category of an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Requested object does not exist.
    NotFound,
    /// The backing store failed to return the object.
    FetchFailed,
    /// The backing store failed to list the bucket.
    ListFailed,
    /// The request line was invalid.
    MalformedRequest,
    /// Unknown or internal error.
    InternalError,
}

impl ErrorCode {
    const ALL: [ErrorCode; 5] = [
        Self::NotFound,
        Self::FetchFailed,
        Self::ListFailed,
        Self::MalformedRequest,
        Self::InternalError,
    ];

    /// Returns the label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::FetchFailed => "fetch failed",
            Self::ListFailed => "list failed",
            Self::MalformedRequest => "malformed request",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error response details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Creates a malformed request error.
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedRequest, message)
    }

    /// Encodes the error body: `ERROR: <code>: <message>`.
    pub fn encode(&self) -> Vec<u8> {
        format!("{}{}: {}", ERROR_PREFIX, self.code, self.message).into_bytes()
    }

    /// Decodes an error body.
    ///
    /// Bodies without a recognised code (as sent by older servers) decode
    /// as [`ErrorCode::InternalError`] carrying the whole text.
    pub fn decode(body: &[u8]) -> ProtocolResult<Self> {
        let text = std::str::from_utf8(body)
            .map_err(|_| ProtocolError::violation("error body is not valid UTF-8"))?;
        let rest = text.strip_prefix(ERROR_PREFIX).ok_or_else(|| {
            ProtocolError::violation(format!("error body does not start with `{}`", ERROR_PREFIX))
        })?;

        for code in ErrorCode::ALL {
            if let Some(message) = rest
                .strip_prefix(code.as_str())
                .and_then(|r| r.strip_prefix(": "))
            {
                return Ok(Self::new(code, message));
            }
        }

        Ok(Self::new(ErrorCode::InternalError, rest))
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
