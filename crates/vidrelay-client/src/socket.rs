//! TCP client for the relay server.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use vidrelay_core::DEFAULT_SERVER_ADDR;
use vidrelay_protocol::{
    DEFAULT_CHUNK_SIZE, ErrorCode, ErrorResponse, FrameHeader, Request, ResponseKind,
    decode_listing, read_frame_body, read_frame_header,
};

use crate::error::{ClientError, ClientResult};
use crate::sink::Sink;

/// Client for fetching objects from a relay server.
///
/// Every call opens its own connection; nothing is retried.
#[derive(Debug, Clone)]
pub struct TransferClient {
    address: String,
    timeout: Duration,
}

impl TransferClient {
    /// Creates a new client for `address` (`host:port`).
    ///
    /// `timeout` bounds the connect and each individual read or write.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    /// Creates a client for the default local server.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SERVER_ADDR, Duration::from_secs(30))
    }

    /// Returns the server address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches `object` from `bucket` into `sink` and returns the sink's output.
    ///
    /// The sink is finished only once every announced byte has arrived. On any
    /// error the sink is dropped, so a [`FileSink`](crate::sink::FileSink)
    /// leaves no file behind.
    pub async fn fetch_object<S: Sink>(
        &self,
        bucket: &str,
        object: &str,
        mut sink: S,
    ) -> ClientResult<S::Output> {
        let start = Instant::now();
        let request = Request::get(bucket, object);
        let mut stream = self.open(&request).await?;

        let header = self.read_header(&mut stream).await?;
        match header.kind {
            ResponseKind::Payload => {}
            ResponseKind::Error => return Err(self.read_error(&mut stream, &header).await),
            ResponseKind::Listing => {
                return Err(ClientError::Protocol(
                    "server answered GET with a listing".into(),
                ));
            }
        }

        debug!(bucket, object, size_bytes = header.size, "Receiving payload");

        let expected = header.size;
        let mut received: u64 = 0;
        let mut buffer = vec![0u8; DEFAULT_CHUNK_SIZE];

        while received < expected {
            let want = (expected - received).min(buffer.len() as u64) as usize;
            let n = match tokio::time::timeout(self.timeout, stream.read(&mut buffer[..want])).await
            {
                Ok(result) => result?,
                Err(_) => return Err(ClientError::Timeout("reading payload".into())),
            };
            if n == 0 {
                return Err(ClientError::Truncated { received, expected });
            }
            sink.write_all(&buffer[..n]).await?;
            received += n as u64;
        }

        let output = sink.finish().await?;

        debug!(
            bucket,
            object,
            size_bytes = received,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetch complete"
        );

        Ok(output)
    }

    /// Lists the objects in `bucket`, or in the server's default bucket.
    pub async fn list_objects(&self, bucket: Option<&str>) -> ClientResult<Vec<String>> {
        let request = match bucket {
            Some(bucket) => Request::list_bucket(bucket),
            None => Request::list(),
        };
        let mut stream = self.open(&request).await?;

        let header = self.read_header(&mut stream).await?;
        match header.kind {
            ResponseKind::Listing => {
                let body = self.read_body(&mut stream, &header).await?;
                let names = decode_listing(&body)?;
                debug!(count = names.len(), "Listing received");
                Ok(names)
            }
            ResponseKind::Error => Err(self.read_error(&mut stream, &header).await),
            ResponseKind::Payload => Err(ClientError::Protocol(
                "server answered LIST with a payload".into(),
            )),
        }
    }

    /// Connects and writes the request line.
    async fn open(&self, request: &Request) -> ClientResult<TcpStream> {
        let line = request.encode_line()?;

        debug!(address = %self.address, request = %request, "Connecting to server");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                ClientError::Connection(format!(
                    "connection to {} timed out after {}s",
                    self.address,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ClientError::Connection(format!("failed to connect to {}: {}", self.address, e))
            })?;

        tokio::time::timeout(self.timeout, stream.write_all(&line))
            .await
            .map_err(|_| ClientError::Timeout("sending request".into()))?
            .map_err(|e| ClientError::Send(e.to_string()))?;

        Ok(stream)
    }

    async fn read_header(&self, stream: &mut TcpStream) -> ClientResult<FrameHeader> {
        tokio::time::timeout(self.timeout, read_frame_header(stream))
            .await
            .map_err(|_| ClientError::Timeout("reading response header".into()))?
            .map_err(ClientError::from)
    }

    async fn read_body(
        &self,
        stream: &mut TcpStream,
        header: &FrameHeader,
    ) -> ClientResult<Vec<u8>> {
        tokio::time::timeout(self.timeout, read_frame_body(stream, header))
            .await
            .map_err(|_| ClientError::Timeout("reading response body".into()))?
            .map_err(ClientError::from)
    }

    /// Reads an error body and turns it into the matching client error.
    async fn read_error(&self, stream: &mut TcpStream, header: &FrameHeader) -> ClientError {
        let body = match self.read_body(stream, header).await {
            Ok(body) => body,
            Err(e) => return e,
        };

        match ErrorResponse::decode(&body) {
            Ok(error) if error.code == ErrorCode::NotFound => ClientError::NotFound(error.message),
            Ok(error) => ClientError::Remote(error.to_string()),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FileSink, MemorySink};
    use tokio::net::TcpListener;

    /// Serves one connection with a canned response and returns the request
    /// line the client sent.
    async fn canned_server(response: Vec<u8>) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                stream.read_exact(&mut byte).await.unwrap();
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
            }
            stream.write_all(&response).await.unwrap();
            String::from_utf8(line).unwrap()
        });

        (addr, handle)
    }

    /// Like `canned_server`, but keeps the connection open after the
    /// response until the client hangs up.
    async fn stalling_server(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 64];
            let _ = stream.read(&mut request).await.unwrap();
            stream.write_all(&response).await.unwrap();
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest).await;
        });

        addr
    }

    fn client(addr: &str) -> TransferClient {
        TransferClient::new(addr, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn fetch_into_memory() {
        let (addr, server) = canned_server(b"P12              HELLO WORLD!".to_vec()).await;

        let data = client(&addr)
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
            .unwrap();

        assert_eq!(data, b"HELLO WORLD!");
        assert_eq!(server.await.unwrap(), "GET demo sample.mp4");
    }

    #[tokio::test]
    async fn fetch_zero_length() {
        let (addr, _server) = canned_server(b"P0               ".to_vec()).await;
        let data = client(&addr)
            .fetch_object("demo", "empty.mp4", MemorySink::new())
            .await
            .unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn fetch_detects_truncation() {
        let (addr, _server) = canned_server(b"P12              HELLO".to_vec()).await;
        let err = client(&addr)
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Truncated {
                received: 5,
                expected: 12
            }
        ));
    }

    #[tokio::test]
    async fn fetch_rejects_short_header() {
        let (addr, _server) = canned_server(b"P12   ".to_vec()).await;
        let err = client(&addr)
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn fetch_rejects_non_numeric_header() {
        let (addr, _server) = canned_server(b"P12a             HELLO".to_vec()).await;
        let err = client(&addr)
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn error_frames_map_to_client_errors() {
        let body = b"ERROR: not found: nope.mp4";
        let mut response = FrameHeader::encode_frame(ResponseKind::Error, body).unwrap();
        let (addr, _server) = canned_server(response.clone()).await;
        let err = client(&addr)
            .fetch_object("demo", "nope.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref name) if name == "nope.mp4"));

        response = FrameHeader::encode_frame(ResponseKind::Error, b"ERROR: fetch failed: failed to fetch a.mp4")
            .unwrap();
        let (addr, _server) = canned_server(response).await;
        let err = client(&addr)
            .fetch_object("demo", "a.mp4", MemorySink::new())
            .await
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"server error: fetch failed: failed to fetch a.mp4");
    }

    #[tokio::test]
    async fn list_default_bucket() {
        let response = FrameHeader::encode_frame(ResponseKind::Listing, b"a.mp4,b.mp4").unwrap();
        let (addr, server) = canned_server(response).await;

        let names = client(&addr).list_objects(None).await.unwrap();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
        assert_eq!(server.await.unwrap(), "LIST");
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = client(&addr).list_objects(Some("demo")).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_locally() {
        let err = client("127.0.0.1:1")
            .fetch_object("demo", "two words.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out_on_header() {
        let addr = stalling_server(Vec::new()).await;
        let err = TransferClient::new(&addr, Duration::from_millis(200))
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(ref op) if op == "reading response header"));
    }

    #[tokio::test]
    async fn stall_after_header_times_out_without_leaving_a_file() {
        let addr = stalling_server(b"P12              ".to_vec()).await;
        let dir = tempfile::tempdir().unwrap();

        let sink = FileSink::create(dir.path(), "sample.mp4").unwrap();
        let err = TransferClient::new(&addr, Duration::from_millis(200))
            .fetch_object("demo", "sample.mp4", sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout(ref op) if op == "reading payload"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn stall_mid_payload_times_out_without_leaving_a_file() {
        let addr = stalling_server(b"P12              HEL".to_vec()).await;
        let dir = tempfile::tempdir().unwrap();

        let sink = FileSink::create(dir.path(), "sample.mp4").unwrap();
        let err = TransferClient::new(&addr, Duration::from_millis(200))
            .fetch_object("demo", "sample.mp4", sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout(ref op) if op == "reading payload"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn stalled_listing_body_times_out() {
        let addr = stalling_server(b"L11              a.mp4".to_vec()).await;
        let err = TransferClient::new(&addr, Duration::from_millis(200))
            .list_objects(Some("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout(ref op) if op == "reading response body"));
    }
}
