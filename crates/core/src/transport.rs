//! Transport trait definition
//!
//! This trait is the seam between the operation engine and the wire. A
//! concrete implementation owns signing, connection pooling, retries and
//! timeouts; the engine only sees status codes, headers and body streams.
//! In-memory implementations back the engine's tests.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::headers::StorageHeaders;
use crate::path::ObjectPath;

/// Boxed byte stream used for request and response bodies
pub type BoxAsyncRead = Box<dyn AsyncRead + Send + Unpin>;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request payload
pub enum Body {
    Empty,
    Bytes(Vec<u8>),
    /// Streamed payload; no `len` means chunked transfer
    Stream {
        reader: BoxAsyncRead,
        len: Option<u64>,
    },
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(data) => write!(f, "Body::Bytes({} bytes)", data.len()),
            Body::Stream { len, .. } => write!(f, "Body::Stream(len: {len:?})"),
        }
    }
}

/// One request to the storage service
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: ObjectPath,
    pub query: Vec<(String, String)>,
    pub headers: StorageHeaders,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, path: ObjectPath) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: StorageHeaders::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: ObjectPath) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn head(path: ObjectPath) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn put(path: ObjectPath) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: ObjectPath) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn headers(mut self, headers: StorageHeaders) -> Self {
        self.headers.extend(&headers);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }
}

/// One response from the storage service
///
/// Any HTTP-level outcome is a `Response`; only connection/IO failures are
/// transport errors. The body is lazy: bytes transfer as it is polled.
pub struct Response {
    pub status: u16,
    pub headers: StorageHeaders,
    pub body: BoxAsyncRead,
}

impl Response {
    pub fn new(status: u16, headers: StorageHeaders, body: BoxAsyncRead) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// A bodyless response (HEAD, or a status-only reply)
    pub fn empty(status: u16, headers: StorageHeaders) -> Self {
        Self::new(status, headers, Box::new(tokio::io::empty()))
    }

    pub fn with_bytes(status: u16, headers: StorageHeaders, bytes: Vec<u8>) -> Self {
        Self::new(status, headers, Box::new(std::io::Cursor::new(bytes)))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Trait for the request/response wire protocol
///
/// Implementations return `Ok` for every status code the service produces;
/// `Err` is reserved for connection and IO failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response>;
}
