//! Wire framing and request/response types for vidrelay.
//!
//! This crate defines the protocol spoken between the vidrelay client and
//! the relay server over a TCP stream. One connection carries exactly one
//! request and one response.
//!
//! # Requests
//!
//! A request is a single line of UTF-8 text terminated by `\n`:
//!
//! ```text
//! LIST
//! LIST <bucket>
//! GET <bucket> <object>
//! ```
//!
//! # Responses
//!
//! Every response starts with a one-byte kind tag and a 16-byte ASCII
//! decimal size field, followed by exactly `size` bytes of body:
//!
//! ```text
//! +---------+-------------------------+-------------------+
//! | kind(1) | size (16, space-padded) | body (size bytes) |
//! +---------+-------------------------+-------------------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use vidrelay_protocol::{FrameHeader, Request, ResponseKind};
//!
//! let request = Request::parse_line("GET demo sample.mp4").unwrap();
//! assert_eq!(request, Request::get("demo", "sample.mp4"));
//!
//! let header = FrameHeader::new(ResponseKind::Payload, 12).encode().unwrap();
//! assert_eq!(&header[..], b"P12              ");
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{
    FrameHeader, decode_listing, decode_size_header, encode_listing, encode_size_header,
    read_frame_body, read_frame_header, read_request_line,
};
pub use types::{ErrorCode, ErrorResponse, Request, ResponseKind};

/// Width of the ASCII decimal size field.
pub const SIZE_HEADER_LEN: usize = 16;

/// Width of a full response header (kind byte + size field).
pub const FRAME_HEADER_LEN: usize = 1 + SIZE_HEADER_LEN;

/// Maximum length of a request line, excluding the terminator.
pub const MAX_REQUEST_LINE: usize = 1024;

/// Maximum body size for listing and error frames (1 MB).
pub const MAX_MESSAGE_SIZE: u64 = 1024 * 1024;

/// Largest payload size representable in the 16-digit size field.
pub const MAX_PAYLOAD_SIZE: u64 = 9_999_999_999_999_999;

/// Default chunk size for streaming payload bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Prefix carried by every error body.
pub const ERROR_PREFIX: &str = "ERROR: ";
