//! End-to-end tests: a real relay server on 127.0.0.1 driven by `TransferClient`.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vidrelay_client::{ClientError, FileSink, MemorySink, TransferClient};
use vidrelay_protocol::{ErrorCode, ErrorResponse, FRAME_HEADER_LEN, FrameHeader, ResponseKind};
use vidrelay_server::{ServerConfig, SignalHandler, TransferServer, make_connection_handler};
use vidrelay_store::MemoryBlobStore;

const ONE_MIB_PLUS_SEVEN: usize = 1024 * 1024 + 7;

fn fixture_store() -> MemoryBlobStore {
    let large: Vec<u8> = (0..ONE_MIB_PLUS_SEVEN).map(|i| (i % 251) as u8).collect();
    let store = MemoryBlobStore::new()
        .with_object("demo", "sample.mp4", "HELLO WORLD!")
        .unwrap()
        .with_object("demo", "empty.mp4", "")
        .unwrap()
        .with_object("demo", "large.mp4", large)
        .unwrap()
        .with_object("videos", "intro.mp4", "intro")
        .unwrap();
    store.create_bucket("empty").unwrap();
    store
}

/// Starts a server on an ephemeral port and returns its address.
async fn start_server(config: ServerConfig) -> String {
    let server = TransferServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let handler = make_connection_handler(
        Arc::new(fixture_store()),
        server.config().default_bucket.clone(),
    );
    tokio::spawn(async move { server.run(handler).await });
    addr
}

async fn default_server() -> String {
    start_server(ServerConfig::new("127.0.0.1:0").with_connection_timeout(Duration::from_secs(5)))
        .await
}

fn client(addr: &str) -> TransferClient {
    TransferClient::new(addr, Duration::from_secs(5))
}

/// Sends raw bytes and returns everything the server answers.
async fn raw_exchange(addr: &str, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

fn decode_error_frame(response: &[u8]) -> ErrorResponse {
    let header: [u8; FRAME_HEADER_LEN] = response[..FRAME_HEADER_LEN].try_into().unwrap();
    let header = FrameHeader::decode(&header).unwrap();
    assert_eq!(header.kind, ResponseKind::Error);
    assert_eq!(header.size as usize, response.len() - FRAME_HEADER_LEN);
    ErrorResponse::decode(&response[FRAME_HEADER_LEN..]).unwrap()
}

#[tokio::test]
async fn round_trip_sizes() {
    let addr = default_server().await;
    let client = client(&addr);

    let empty = client
        .fetch_object("demo", "empty.mp4", MemorySink::new())
        .await
        .unwrap();
    assert!(empty.is_empty());

    let hello = client
        .fetch_object("demo", "sample.mp4", MemorySink::new())
        .await
        .unwrap();
    assert_eq!(hello, b"HELLO WORLD!");

    let large = client
        .fetch_object("demo", "large.mp4", MemorySink::new())
        .await
        .unwrap();
    assert_eq!(large.len(), ONE_MIB_PLUS_SEVEN);
    assert!(large.iter().enumerate().all(|(i, b)| *b == (i % 251) as u8));
}

#[tokio::test]
async fn hello_world_wire_format() {
    let addr = default_server().await;
    let response = raw_exchange(&addr, b"GET demo sample.mp4\n").await;
    assert_eq!(response, b"P12              HELLO WORLD!");
}

#[tokio::test]
async fn fetch_to_file() {
    let addr = default_server().await;
    let dir = tempfile::tempdir().unwrap();

    let sink = FileSink::create(dir.path(), "sample.mp4").unwrap();
    let path = client(&addr)
        .fetch_object("demo", "sample.mp4", sink)
        .await
        .unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mp4"));
    assert_eq!(std::fs::read(&path).unwrap(), b"HELLO WORLD!");
}

#[tokio::test]
async fn truncated_transfer_leaves_no_file() {
    // A fake server that announces 12 bytes, sends 5, and hangs up.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 64];
        let _ = stream.read(&mut request).await.unwrap();
        stream.write_all(b"P12              HELLO").await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let sink = FileSink::create(dir.path(), "sample.mp4").unwrap();
    let err = client(&addr)
        .fetch_object("demo", "sample.mp4", sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Truncated {
            received: 5,
            expected: 12
        }
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn not_found_then_server_keeps_serving() {
    let addr = default_server().await;
    let client = client(&addr);

    let err = client
        .fetch_object("demo", "nope.mp4", MemorySink::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    insta::assert_snapshot!(err.to_string(), @"not found: nope.mp4");

    let data = client
        .fetch_object("demo", "sample.mp4", MemorySink::new())
        .await
        .unwrap();
    assert_eq!(data, b"HELLO WORLD!");
}

#[tokio::test]
async fn concurrent_fetches_complete_independently() {
    let addr = default_server().await;
    let client = client(&addr);

    let (large, small) = tokio::join!(
        client.fetch_object("demo", "large.mp4", MemorySink::new()),
        client.fetch_object("demo", "sample.mp4", MemorySink::new()),
    );

    assert_eq!(large.unwrap().len(), ONE_MIB_PLUS_SEVEN);
    assert_eq!(small.unwrap(), b"HELLO WORLD!");
}

#[tokio::test]
async fn listings() {
    let addr = default_server().await;
    let client = client(&addr);

    assert!(client.list_objects(Some("empty")).await.unwrap().is_empty());
    assert_eq!(
        client.list_objects(Some("demo")).await.unwrap(),
        vec!["empty.mp4", "large.mp4", "sample.mp4"]
    );
    assert_eq!(client.list_objects(None).await.unwrap(), vec!["intro.mp4"]);

    let err = client.list_objects(Some("missing")).await.unwrap_err();
    assert!(matches!(err, ClientError::Remote(_)));
}

#[tokio::test]
async fn malformed_requests_get_error_frames() {
    let addr = default_server().await;

    let response = raw_exchange(&addr, b"DELETE everything\n").await;
    let error = decode_error_frame(&response);
    assert_eq!(error.code, ErrorCode::MalformedRequest);
    insta::assert_snapshot!(error.message, @"unknown verb `DELETE`");

    let response = raw_exchange(&addr, b"GET demo\r\n").await;
    assert_eq!(decode_error_frame(&response).code, ErrorCode::MalformedRequest);

    let oversize = vec![b'A'; 1100];
    let response = raw_exchange(&addr, &oversize).await;
    assert_eq!(decode_error_frame(&response).code, ErrorCode::MalformedRequest);

    // Still serving.
    let response = raw_exchange(&addr, b"GET demo sample.mp4\r\n").await;
    assert_eq!(response, b"P12              HELLO WORLD!");
}

#[tokio::test]
async fn connection_bound_queues_extra_clients() {
    let addr = start_server(
        ServerConfig::new("127.0.0.1:0")
            .with_max_connections(1)
            .with_connection_timeout(Duration::from_secs(5)),
    )
    .await;

    // Holds the only slot until it sends its request.
    let mut first = TcpStream::connect(&addr).await.unwrap();

    let second_client = client(&addr);
    let second = tokio::spawn(async move {
        second_client
            .fetch_object("demo", "sample.mp4", MemorySink::new())
            .await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!second.is_finished());

    first.write_all(b"LIST demo\n").await.unwrap();
    let mut response = Vec::new();
    first.read_to_end(&mut response).await.unwrap();
    assert_eq!(response[0], b'L');
    drop(first);

    let data = tokio::time::timeout(Duration::from_secs(5), second)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(data, b"HELLO WORLD!");
}

#[tokio::test]
async fn connection_refused_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = client(&addr)
        .fetch_object("demo", "sample.mp4", MemorySink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
}

#[tokio::test]
async fn serve_stops_on_shutdown() {
    let signals = SignalHandler::new();
    let handle = signals.shutdown_handle();

    let task = tokio::spawn(vidrelay_server::serve_until_shutdown(
        ServerConfig::new("127.0.0.1:0"),
        Arc::new(fixture_store()),
        handle.wait().wait(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.trigger();

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
