//! Request dispatch.
//!
//! Resolves a parsed [`Request`] against the blob store and writes the single
//! response frame for the connection.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{Instrument, debug, info, info_span, warn};

use vidrelay_protocol::{ErrorCode, ErrorResponse, ProtocolError, Request, ResponseKind, encode_listing};
use vidrelay_store::BlobStore;

use crate::error::{ServerError, ServerResult};
use crate::socket::Connection;

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Object bytes for a `GET`.
    Payload(Bytes),
    /// Object names for a `LIST`.
    Listing(Vec<String>),
    /// Error sent back to the client.
    Error(ErrorResponse),
}

/// Handles requests against a blob store.
#[derive(Clone)]
pub struct RequestHandler {
    store: Arc<dyn BlobStore>,
    default_bucket: String,
}

impl RequestHandler {
    /// Creates a handler serving `store`; `LIST` without a bucket lists
    /// `default_bucket`.
    pub fn new(store: Arc<dyn BlobStore>, default_bucket: impl Into<String>) -> Self {
        Self {
            store,
            default_bucket: default_bucket.into(),
        }
    }

    /// Resolves a request to its reply.
    ///
    /// Store errors are logged here; the reply carries only a short message
    /// naming the object or bucket.
    #[tracing::instrument(skip(self), fields(verb = request.verb()))]
    pub async fn resolve(&self, request: &Request) -> Reply {
        let start = std::time::Instant::now();

        let reply = match request {
            Request::List { bucket } => {
                let bucket = bucket.as_deref().unwrap_or(&self.default_bucket);
                match self.store.list(bucket).await {
                    Ok(names) => Reply::Listing(names),
                    Err(e) => {
                        warn!(bucket, backend = self.store.name(), error = %e, "List failed");
                        Reply::Error(ErrorResponse::new(
                            ErrorCode::ListFailed,
                            format!("failed to list bucket {}", bucket),
                        ))
                    }
                }
            }
            Request::Get { bucket, object } => match self.store.fetch(bucket, object).await {
                Ok(data) => Reply::Payload(data),
                Err(e) if e.is_not_found() => {
                    info!(bucket, object, "Object not found");
                    Reply::Error(ErrorResponse::not_found(object.clone()))
                }
                Err(e) => {
                    warn!(bucket, object, backend = self.store.name(), error = %e, "Fetch failed");
                    Reply::Error(ErrorResponse::new(
                        ErrorCode::FetchFailed,
                        format!("failed to fetch {}", object),
                    ))
                }
            },
        };

        debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Request resolved"
        );
        reply
    }

    /// Serves one connection: read the request, write the reply, close.
    pub async fn handle_connection(&self, mut conn: Connection) -> ServerResult<()> {
        let request = match conn.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("Client disconnected before sending a request");
                return Ok(());
            }
            Err(ServerError::Protocol(ProtocolError::MalformedRequest { reason })) => {
                info!(reason = %reason, "Malformed request");
                conn.send_error(&ErrorResponse::malformed_request(reason))
                    .await?;
                return conn.finish().await;
            }
            Err(e) => return Err(e),
        };

        match self.resolve(&request).await {
            Reply::Payload(data) => {
                conn.send_payload(&data).await?;
                info!(request = %request, size_bytes = data.len(), "Sent payload");
            }
            Reply::Listing(names) => {
                let body = match encode_listing(&names) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(error = %e, "Listing cannot be encoded");
                        conn.send_error(&ErrorResponse::new(
                            ErrorCode::ListFailed,
                            "listing contains names that cannot be sent",
                        ))
                        .await?;
                        return conn.finish().await;
                    }
                };
                conn.send_frame(ResponseKind::Listing, &body).await?;
                info!(request = %request, count = names.len(), "Sent listing");
            }
            Reply::Error(error) => {
                conn.send_error(&error).await?;
            }
        }

        conn.finish().await
    }
}

/// Creates a connection handler function for use with
/// [`TransferServer::run`](crate::TransferServer::run).
pub fn make_connection_handler(
    store: Arc<dyn BlobStore>,
    default_bucket: impl Into<String>,
) -> impl Fn(Connection) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
    let handler = RequestHandler::new(store, default_bucket);
    move |conn| {
        let handler = handler.clone();
        let span = info_span!("connection", peer = %conn.peer_addr());
        Box::pin(
            async move {
                if let Err(e) = handler.handle_connection(conn).await {
                    warn!(error = %e, "Connection handler error");
                }
            }
            .instrument(span),
        )
    }
}
