//! TCP listener and per-connection IO.
//!
//! Every accepted connection carries exactly one request and one response.
//! Concurrency is bounded by a semaphore; each read or write is bounded by the
//! configured connection timeout.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use vidrelay_protocol::{
    ErrorResponse, FrameHeader, ProtocolError, Request, ResponseKind, read_request_line,
};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Pause after a failed accept, so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server accepting transfer connections.
pub struct TransferServer {
    /// Server configuration.
    config: ServerConfig,
    /// TCP listener.
    listener: TcpListener,
    /// Semaphore for limiting concurrent connections.
    connection_semaphore: Arc<Semaphore>,
}

impl TransferServer {
    /// Validates the configuration and binds the listen address.
    ///
    /// Fails with [`ServerError::Bind`] if the address is unavailable.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .map_err(|e| ServerError::bind(&config.listen_addr, e))?;

        let local_addr = listener.local_addr()?;
        info!(
            addr = %local_addr,
            max_connections = config.max_connections,
            "Transfer server listening"
        );

        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Ok(Self {
            config,
            listener,
            connection_semaphore,
        })
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts a single connection.
    ///
    /// Waits for a free connection slot before accepting, so at most
    /// `max_connections` connections are open at once.
    pub async fn accept(&self) -> ServerResult<Connection> {
        let permit = self
            .connection_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServerError::config("connection semaphore closed"))?;

        let (stream, peer) = self.listener.accept().await?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }
        debug!(peer = %peer, "Accepted new connection");

        Ok(Connection {
            stream,
            peer,
            timeout: self.config.connection_timeout,
            chunk_size: self.config.chunk_size,
            _permit: permit,
        })
    }

    /// Runs the accept loop, spawning the handler for each connection.
    ///
    /// Never returns on its own; accept errors are logged and skipped.
    pub async fn run<F, Fut>(&self, handler: F) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        loop {
            match self.accept().await {
                Ok(connection) => {
                    tokio::spawn(handler(connection));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    /// Runs the accept loop until the shutdown future completes, then drains.
    ///
    /// Once `shutdown` fires no new connection is accepted. Connections already
    /// being served get up to `shutdown_timeout` to finish before this returns.
    pub async fn run_until_shutdown<F, Fut, S>(&self, handler: F, shutdown: S) -> ServerResult<()>
    where
        F: Fn(Connection) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run(handler) => return result,
            _ = shutdown => info!("Shutdown signal received"),
        }
        self.drain().await;
        Ok(())
    }

    /// Waits until every connection slot is free, up to `shutdown_timeout`.
    ///
    /// Returns `false` if connections were still open when the timeout expired.
    pub async fn drain(&self) -> bool {
        let in_flight = self.config.max_connections - self.connection_semaphore.available_permits();
        if in_flight == 0 {
            return true;
        }
        info!(in_flight, "Waiting for open connections to finish");

        let all = u32::try_from(self.config.max_connections).unwrap_or(u32::MAX);
        match tokio::time::timeout(
            self.config.shutdown_timeout,
            self.connection_semaphore.acquire_many(all),
        )
        .await
        {
            Ok(_) => true,
            Err(_) => {
                warn!(
                    in_flight = self.config.max_connections
                        - self.connection_semaphore.available_permits(),
                    "Shutdown timeout expired with connections still open"
                );
                false
            }
        }
    }
}

/// One accepted client connection.
///
/// Dropping the connection closes the socket and frees its slot.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
    chunk_size: usize,
    _permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Reads and parses the request line.
    ///
    /// Returns `Ok(None)` if the client closed the connection without sending
    /// anything.
    pub async fn read_request(&mut self) -> ServerResult<Option<Request>> {
        let line = match tokio::time::timeout(self.timeout, read_request_line(&mut self.stream))
            .await
        {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ProtocolError::timeout("read request").into()),
        };

        debug!(peer = %self.peer, request = %line, "Received request line");
        Ok(Some(Request::parse_line(&line)?))
    }

    async fn write_timed(&mut self, data: &[u8], operation: &str) -> ServerResult<()> {
        match tokio::time::timeout(self.timeout, self.stream.write_all(data)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(ProtocolError::timeout(operation).into()),
        }
    }

    /// Sends a buffered frame (listing or error).
    pub async fn send_frame(&mut self, kind: ResponseKind, body: &[u8]) -> ServerResult<()> {
        let frame = FrameHeader::encode_frame(kind, body)?;
        self.write_timed(&frame, "write response").await
    }

    /// Sends an error response.
    pub async fn send_error(&mut self, error: &ErrorResponse) -> ServerResult<()> {
        self.send_frame(ResponseKind::Error, &error.encode()).await
    }

    /// Sends the payload header, then the bytes in `chunk_size` writes.
    pub async fn send_payload(&mut self, data: &[u8]) -> ServerResult<()> {
        let header = FrameHeader::new(ResponseKind::Payload, data.len() as u64).encode()?;
        self.write_timed(&header, "write payload header").await?;

        let chunk_size = self.chunk_size;
        for chunk in data.chunks(chunk_size) {
            self.write_timed(chunk, "write payload").await?;
        }
        Ok(())
    }

    /// Flushes and half-closes the connection.
    pub async fn finish(&mut self) -> ServerResult<()> {
        match tokio::time::timeout(self.timeout, self.stream.shutdown()).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProtocolError::timeout("close connection").into()),
        }
    }
}
