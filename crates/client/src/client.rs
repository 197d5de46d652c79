//! Storage client and CRUD operations
//!
//! The client is generic over the `Transport` seam and cheap to clone; all
//! clones share the transport's connection pool. Concurrent use from many
//! tasks is safe as long as each stream handle stays with a single owner.

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use shoal_core::headers::CONTENT_TYPE;
use shoal_core::{
    classify, Body, BoxAsyncRead, ClientConfig, ErrorContext, Method, ObjectInfo, ObjectPath,
    Request, Response, Result, StorageError, StorageHeaders, Transport,
};

use crate::crypto::ContentCipher;
use crate::listing::{DirectoryListing, DEFAULT_PAGE_SIZE};
use crate::stream::{ObjectReader, ObjectWriter};

struct Inner<T> {
    config: ClientConfig,
    transport: T,
    cipher: Option<Arc<dyn ContentCipher>>,
}

/// Client for a path-addressed hierarchical object store
pub struct StorageClient<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for StorageClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> StorageClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                cipher: None,
            }),
        }
    }

    /// Construct a client whose object bodies are transparently encrypted
    /// on the wire
    pub fn with_cipher(
        config: ClientConfig,
        transport: T,
        cipher: Arc<dyn ContentCipher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                cipher: Some(cipher),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) async fn send(&self, request: Request) -> Result<Response> {
        self.inner.transport.send(request).await
    }

    /// Turn a non-success response into a classified error
    pub(crate) async fn check(
        &self,
        response: Response,
        method: Method,
        path: &ObjectPath,
    ) -> Result<Response> {
        if response.is_success() {
            return Ok(response);
        }
        Err(classify_response(response, method, path).await)
    }

    /// Fetch object metadata without transferring the body
    pub async fn head(&self, path: &ObjectPath) -> Result<ObjectInfo> {
        let response = self.send(Request::head(path.clone())).await?;
        let response = self.check(response, Method::Head, path).await?;
        Ok(ObjectInfo::from_headers(path.clone(), response.headers))
    }

    /// Open a read stream over the object at `path`
    ///
    /// The request is issued eagerly so a missing path fails here, but body
    /// bytes only transfer as the returned reader is polled.
    pub async fn get(&self, path: &ObjectPath) -> Result<ObjectReader> {
        let response = self.send(Request::get(path.clone())).await?;
        let response = self.check(response, Method::Get, path).await?;
        let info = ObjectInfo::from_headers(path.clone(), response.headers);
        let body = match &self.inner.cipher {
            Some(cipher) if !info.is_directory() => cipher.decrypt(response.body),
            _ => response.body,
        };
        Ok(ObjectReader::new(info, body))
    }

    /// Fetch the full object body into memory
    pub async fn get_as_bytes(&self, path: &ObjectPath) -> Result<Vec<u8>> {
        self.get(path).await?.bytes().await
    }

    /// Fetch the object body as UTF-8 text
    pub async fn get_as_string(&self, path: &ObjectPath) -> Result<String> {
        let bytes = self.get_as_bytes(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            StorageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Download the object body to a local file, returning the byte count
    pub async fn get_to_file(
        &self,
        path: &ObjectPath,
        local: &std::path::Path,
    ) -> Result<u64> {
        let mut reader = self.get(path).await?;
        let mut file = tokio::fs::File::create(local).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(written)
    }

    /// Create or overwrite the object at `path` from an in-memory payload
    pub async fn put(&self, path: &ObjectPath, data: impl Into<Vec<u8>>) -> Result<ObjectInfo> {
        self.put_with_headers(path, data, StorageHeaders::new())
            .await
    }

    /// `put` with caller headers sent verbatim (e.g. `durability-level`)
    pub async fn put_with_headers(
        &self,
        path: &ObjectPath,
        data: impl Into<Vec<u8>>,
        headers: StorageHeaders,
    ) -> Result<ObjectInfo> {
        let data = data.into();
        let headers = self.write_headers(path, headers);
        tracing::debug!(path = %path, bytes = data.len(), "put object");
        let body = match &self.inner.cipher {
            Some(cipher) => Body::Stream {
                reader: cipher.encrypt(Box::new(std::io::Cursor::new(data))),
                len: None,
            },
            None => Body::Bytes(data),
        };
        let request = Request::put(path.clone()).headers(headers).body(body);
        let response = self.send(request).await?;
        let response = self.check(response, Method::Put, path).await?;
        Ok(ObjectInfo::from_headers(path.clone(), response.headers))
    }

    /// Create or overwrite the object at `path` from a byte stream
    ///
    /// Without `content_length` the payload is sent with chunked transfer.
    pub async fn put_stream<R>(
        &self,
        path: &ObjectPath,
        reader: R,
        content_length: Option<u64>,
        headers: StorageHeaders,
    ) -> Result<ObjectInfo>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let headers = self.write_headers(path, headers);
        let reader: BoxAsyncRead = Box::new(reader);
        let (reader, len) = match &self.inner.cipher {
            Some(cipher) => (cipher.encrypt(reader), None),
            None => (reader, content_length),
        };
        let request = Request::put(path.clone())
            .headers(headers)
            .body(Body::Stream { reader, len });
        let response = self.send(request).await?;
        let response = self.check(response, Method::Put, path).await?;
        Ok(ObjectInfo::from_headers(path.clone(), response.headers))
    }

    /// Upload a local file to `path`
    ///
    /// Content type is inferred from the remote path's extension, not the
    /// local file name.
    pub async fn put_file(
        &self,
        path: &ObjectPath,
        local: &std::path::Path,
    ) -> Result<ObjectInfo> {
        let file = tokio::fs::File::open(local).await?;
        let len = file.metadata().await?.len();
        self.put_stream(path, file, Some(len), StorageHeaders::new())
            .await
    }

    /// Remove the object or empty directory at `path`
    pub async fn delete(&self, path: &ObjectPath) -> Result<()> {
        tracing::debug!(path = %path, "delete object");
        let response = self.send(Request::delete(path.clone())).await?;
        self.check(response, Method::Delete, path).await?;
        Ok(())
    }

    /// Lazily enumerate the immediate children of a directory
    ///
    /// The first page is fetched before this returns, so a missing path
    /// fails with NotFound and a file path with TypeMismatch here, never
    /// mid-iteration.
    pub async fn list_objects(&self, dir: &ObjectPath) -> Result<DirectoryListing<T>> {
        self.list_objects_paged(dir, DEFAULT_PAGE_SIZE).await
    }

    /// `list_objects` with an explicit page size
    pub async fn list_objects_paged(
        &self,
        dir: &ObjectPath,
        page_size: usize,
    ) -> Result<DirectoryListing<T>> {
        DirectoryListing::open(self.clone(), dir, page_size).await
    }

    /// Headers applied to every write: content-type inference from the
    /// filename extension and the configured default durability
    fn write_headers(&self, path: &ObjectPath, mut headers: StorageHeaders) -> StorageHeaders {
        if headers.content_type().is_none() {
            if let Some(name) = path.file_name() {
                if let Some(mime) = mime_guess::from_path(name).first_raw() {
                    headers.set(CONTENT_TYPE, mime);
                }
            }
        }
        if headers.durability_level().is_none() {
            if let Some(level) = self.inner.config.default_durability {
                headers.set_durability_level(level);
            }
        }
        headers
    }
}

impl<T: Transport + 'static> StorageClient<T> {
    /// Open a write stream to `path`
    ///
    /// The upload request starts immediately on a background task; bytes
    /// written to the returned handle feed it through an in-process pipe.
    /// Call [`ObjectWriter::finish`] to close the payload and obtain the
    /// created object's metadata. The handle may be moved to and finished
    /// in a different task.
    pub fn open_write(
        &self,
        path: &ObjectPath,
        content_length: Option<u64>,
        headers: StorageHeaders,
    ) -> ObjectWriter {
        let headers = self.write_headers(path, headers);
        let (pipe, feed) = tokio::io::duplex(64 * 1024);
        let reader: BoxAsyncRead = Box::new(feed);
        let (reader, len) = match &self.inner.cipher {
            Some(cipher) => (cipher.encrypt(reader), None),
            None => (reader, content_length),
        };

        let client = self.clone();
        let path = path.clone();
        let upload = tokio::spawn(async move {
            let request = Request::put(path.clone())
                .headers(headers)
                .body(Body::Stream { reader, len });
            let response = client.send(request).await?;
            let response = client.check(response, Method::Put, &path).await?;
            Ok(ObjectInfo::from_headers(path, response.headers))
        });

        ObjectWriter::new(pipe, upload)
    }
}

/// Service error response body
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Read the error body (when one exists) and classify the outcome
async fn classify_response(
    response: Response,
    method: Method,
    path: &ObjectPath,
) -> StorageError {
    let Response {
        status, mut body, ..
    } = response;

    let mut buf = Vec::new();
    if body.read_to_end(&mut buf).await.is_err() {
        buf.clear();
    }
    let parsed: Option<ServiceErrorBody> = serde_json::from_slice(&buf).ok();
    let (server_code, message) = match parsed {
        Some(body) => (body.code, body.message),
        None => (None, None),
    };

    let mut context = ErrorContext::new();
    context.push("method", method.as_str());
    context.push("path", path.as_str());

    classify(
        status,
        server_code.as_deref(),
        message.unwrap_or_else(|| format!("request failed with status {status}")),
        context,
    )
}
