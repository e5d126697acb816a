//! Framing for requests and responses.
//!
//! Requests are newline-terminated text lines. Responses are framed with a
//! kind byte and a fixed-width ASCII size field:
//!
//! ```text
//! +---------+-------------------------+-------------------+
//! | kind(1) | size (16, space-padded) | body (size bytes) |
//! +---------+-------------------------+-------------------+
//! ```
//!
//! Receivers always stop at `size` bytes; the connection close that follows
//! a response is never part of the message.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::types::ResponseKind;
use crate::{FRAME_HEADER_LEN, MAX_MESSAGE_SIZE, MAX_PAYLOAD_SIZE, MAX_REQUEST_LINE, SIZE_HEADER_LEN};

/// Encodes `size` as a left-justified, space-padded 16-byte decimal field.
///
/// # Example
///
/// ```rust
/// use vidrelay_protocol::encode_size_header;
///
/// assert_eq!(&encode_size_header(12).unwrap(), b"12              ");
/// ```
pub fn encode_size_header(size: u64) -> ProtocolResult<[u8; SIZE_HEADER_LEN]> {
    if size > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let digits = size.to_string();
    let mut field = [b' '; SIZE_HEADER_LEN];
    field[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(field)
}

/// Decodes a 16-byte size field.
///
/// Surrounding ASCII whitespace is ignored; anything other than decimal
/// digits is a protocol violation.
pub fn decode_size_header(field: &[u8]) -> ProtocolResult<u64> {
    if field.len() != SIZE_HEADER_LEN {
        return Err(ProtocolError::violation(format!(
            "size header must be {} bytes, got {}",
            SIZE_HEADER_LEN,
            field.len()
        )));
    }

    let text = std::str::from_utf8(field)
        .map_err(|_| ProtocolError::violation("size header is not ASCII"))?
        .trim_matches(|c: char| c.is_ascii_whitespace());

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::violation(format!(
            "size header is not a decimal number: {:?}",
            text
        )));
    }

    text.parse::<u64>()
        .map_err(|e| ProtocolError::violation(format!("invalid size header: {}", e)))
}

/// Header preceding every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// What the body contains.
    pub kind: ResponseKind,
    /// Exact number of body bytes that follow.
    pub size: u64,
}

impl FrameHeader {
    /// Creates a new frame header.
    pub fn new(kind: ResponseKind, size: u64) -> Self {
        Self { kind, size }
    }

    /// Encodes the header to its 17-byte wire form.
    pub fn encode(&self) -> ProtocolResult<[u8; FRAME_HEADER_LEN]> {
        let mut buffer = [0u8; FRAME_HEADER_LEN];
        buffer[0] = self.kind.as_byte();
        buffer[1..].copy_from_slice(&encode_size_header(self.size)?);
        Ok(buffer)
    }

    /// Decodes a header from its 17-byte wire form.
    pub fn decode(data: &[u8; FRAME_HEADER_LEN]) -> ProtocolResult<Self> {
        let kind = ResponseKind::from_byte(data[0])?;
        let size = decode_size_header(&data[1..])?;
        let header = Self { kind, size };
        header.check_body_limit()?;
        Ok(header)
    }

    /// Listing and error bodies are buffered whole, so they are capped.
    fn check_body_limit(&self) -> ProtocolResult<()> {
        if self.kind != ResponseKind::Payload && self.size > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: self.size,
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(())
    }

    /// Encodes a complete frame (header and body) for a buffered body.
    pub fn encode_frame(kind: ResponseKind, body: &[u8]) -> ProtocolResult<Vec<u8>> {
        let header = Self::new(kind, body.len() as u64);
        header.check_body_limit()?;

        let mut buffer = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
        buffer.extend_from_slice(&header.encode()?);
        buffer.extend_from_slice(body);
        Ok(buffer)
    }
}

/// Joins object names with `,` for a listing body.
///
/// Names containing a comma cannot be represented and are rejected.
pub fn encode_listing<S: AsRef<str>>(names: &[S]) -> ProtocolResult<Vec<u8>> {
    if let Some(bad) = names.iter().find(|n| n.as_ref().contains(',')) {
        return Err(ProtocolError::violation(format!(
            "object name `{}` contains a comma",
            bad.as_ref()
        )));
    }

    let joined = names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(",");
    Ok(joined.into_bytes())
}

/// Splits a listing body into object names. An empty body is an empty list.
pub fn decode_listing(body: &[u8]) -> ProtocolResult<Vec<String>> {
    let text = std::str::from_utf8(body)
        .map_err(|_| ProtocolError::violation("listing is not valid UTF-8"))?;
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(text.split(',').map(str::to_string).collect())
}

/// Reads one request line from the stream.
///
/// Returns `Ok(None)` if the peer closed the connection before sending
/// anything. A peer that closes its write half after an unterminated line is
/// accepted. Bytes after the first `\n` are ignored.
pub async fn read_request_line<R>(reader: &mut R) -> ProtocolResult<Option<String>>
where
    R: AsyncRead + Unpin,
{
    // Room for the line, an optional `\r`, and the `\n`.
    let limit = MAX_REQUEST_LINE + 2;
    let mut buffer = Vec::with_capacity(128);
    let mut chunk = [0u8; 256];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            break;
        }

        buffer.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            buffer.truncate(pos);
            break;
        }

        if buffer.len() > limit {
            return Err(ProtocolError::malformed(format!(
                "request line too long (max: {} bytes)",
                MAX_REQUEST_LINE
            )));
        }
    }

    String::from_utf8(buffer)
        .map(Some)
        .map_err(|_| ProtocolError::malformed("request is not valid UTF-8"))
}

/// Reads a response header.
///
/// A stream that ends before all 17 header bytes arrive is a protocol
/// violation.
pub async fn read_frame_header<R>(reader: &mut R) -> ProtocolResult<FrameHeader>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; FRAME_HEADER_LEN];
    match reader.read_exact(&mut buffer).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::violation(
                "connection closed before the response header was complete",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    FrameHeader::decode(&buffer)
}

/// Reads a buffered (listing or error) body of exactly `header.size` bytes.
pub async fn read_frame_body<R>(reader: &mut R, header: &FrameHeader) -> ProtocolResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    header.check_body_limit()?;

    let expected = header.size;
    let mut body = vec![0u8; expected as usize];
    let mut received = 0usize;

    while received < body.len() {
        let n = reader.read(&mut body[received..]).await?;
        if n == 0 {
            return Err(ProtocolError::IncompleteMessage {
                expected,
                received: received as u64,
            });
        }
        received += n;
    }

    Ok(body)
}
