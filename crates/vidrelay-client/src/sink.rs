//! Destinations for fetched payloads.
//!
//! A [`Sink`] receives payload bytes as they arrive and is finished only after
//! the full announced size was read. A sink dropped before [`Sink::finish`]
//! leaves nothing behind: [`FileSink`] removes its temporary file.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Destination for a payload.
pub trait Sink: AsyncWrite + Unpin + Send {
    /// Value produced once the payload is complete.
    type Output;

    /// Finalizes the sink after every byte was written.
    fn finish(self) -> impl Future<Output = ClientResult<Self::Output>> + Send
    where
        Self: Sized;
}

/// Collects the payload in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    buffer: Vec<u8>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.buffer).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.buffer).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.buffer).poll_shutdown(cx)
    }
}

impl Sink for MemorySink {
    type Output = Vec<u8>;

    async fn finish(self) -> ClientResult<Vec<u8>> {
        Ok(self.buffer)
    }
}

/// Writes the payload to a temporary file that is kept only on success.
///
/// The file is created in the chosen directory with a `vidrelay-` prefix and
/// the object's extension, so players can recognise the container format.
#[derive(Debug)]
pub struct FileSink {
    file: File,
    path: TempPath,
}

impl FileSink {
    /// Creates a temporary file in `dir` for `object`.
    pub fn create(dir: &Path, object: &str) -> ClientResult<Self> {
        let suffix = Path::new(object)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let named = tempfile::Builder::new()
            .prefix("vidrelay-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .map_err(|e| {
                ClientError::Config(format!(
                    "cannot create a download file in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        let (file, path) = named.into_parts();
        debug!(path = %path.display(), "Created download file");

        Ok(Self {
            file: File::from_std(file),
            path,
        })
    }

    /// Returns the path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsyncWrite for FileSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.file).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

impl Sink for FileSink {
    type Output = PathBuf;

    async fn finish(mut self) -> ClientResult<PathBuf> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        drop(self.file);

        let path = self.path.keep().map_err(|e| ClientError::Io(e.error))?;
        debug!(path = %path.display(), "Download complete");
        Ok(path)
    }
}
