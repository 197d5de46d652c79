//! Streaming handles for object bodies
//!
//! Both handle types are single-owner by move semantics: they may be created
//! in one task and consumed or closed in another, but never shared. Dropping
//! a handle releases the underlying connection.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::task::JoinHandle;

use shoal_core::{BoxAsyncRead, ObjectInfo, ObjectPath, Result, StorageError};

/// Read side of a GET: object metadata plus the lazily-transferred body
///
/// Construction performs the request; bytes only move as the reader is
/// polled. A zero-byte object yields an immediately-exhausted reader with
/// `content_length() == Some(0)`.
pub struct ObjectReader {
    info: ObjectInfo,
    body: BoxAsyncRead,
}

impl ObjectReader {
    pub(crate) fn new(info: ObjectInfo, body: BoxAsyncRead) -> Self {
        Self { info, body }
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    pub fn path(&self) -> &ObjectPath {
        self.info.path()
    }

    pub fn content_length(&self) -> Option<u64> {
        self.info.content_length()
    }

    /// Consume the reader, collecting the remaining body into memory
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let capacity = self.info.content_length().unwrap_or(0) as usize;
        let mut buf = Vec::with_capacity(capacity);
        self.body.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Split into metadata and raw body stream
    pub fn into_parts(self) -> (ObjectInfo, BoxAsyncRead) {
        (self.info, self.body)
    }
}

impl AsyncRead for ObjectReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.body).poll_read(cx, buf)
    }
}

impl std::fmt::Debug for ObjectReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectReader")
            .field("path", &self.info.path().as_str())
            .field("content_length", &self.info.content_length())
            .finish_non_exhaustive()
    }
}

/// Write side of a PUT: bytes written here feed an in-flight upload
///
/// The upload request runs on a spawned task reading from the other half of
/// a duplex pipe; [`ObjectWriter::finish`] closes the pipe and waits for the
/// service's response. Dropping without `finish` aborts the upload task so
/// the bytes written so far are never committed as a truncated object.
pub struct ObjectWriter {
    pipe: DuplexStream,
    upload: Option<JoinHandle<Result<ObjectInfo>>>,
}

impl ObjectWriter {
    pub(crate) fn new(pipe: DuplexStream, upload: JoinHandle<Result<ObjectInfo>>) -> Self {
        Self {
            pipe,
            upload: Some(upload),
        }
    }

    /// Signal end of payload and wait for the upload to complete
    pub async fn finish(mut self) -> Result<ObjectInfo> {
        self.pipe.shutdown().await?;
        let Some(upload) = self.upload.take() else {
            return Err(StorageError::Transport("upload already consumed".into()));
        };
        match upload.await {
            Ok(result) => result,
            Err(join_err) => Err(StorageError::Transport(format!(
                "upload task failed: {join_err}"
            ))),
        }
    }

    /// Cancel the upload without waiting for it
    pub fn abort(mut self) {
        if let Some(upload) = self.upload.take() {
            upload.abort();
        }
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        // Closing the pipe alone would read as normal EOF on the upload
        // side; the task must be cancelled before that happens.
        if let Some(upload) = &self.upload {
            upload.abort();
        }
    }
}

impl AsyncWrite for ObjectWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.pipe).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_shutdown(cx)
    }
}

impl std::fmt::Debug for ObjectWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectWriter").finish_non_exhaustive()
    }
}
