//! In-memory storage service used by the integration tests
//!
//! Implements the `Transport` trait over a mutex-guarded tree of nodes with
//! the same observable contract as the real service: directory markers,
//! link-based renames, paginated NDJSON listings, `result-set-size` on
//! directory heads, and JSON error bodies carrying service error codes.

use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use shoal_client::ContentCipher;
use shoal_core::headers::{
    CONTENT_LENGTH, CONTENT_TYPE, DIRECTORY_CONTENT_TYPE, DURABILITY_LEVEL, ETAG, LAST_MODIFIED,
    LINK_CONTENT_TYPE, LOCATION, RESULT_SET_SIZE,
};
use shoal_core::{
    code, Body, BoxAsyncRead, Method, ObjectPath, Request, Response, Result, StorageHeaders,
    Transport,
};

const DEFAULT_LIMIT: usize = 256;

#[derive(Clone)]
struct Node {
    directory: bool,
    data: Vec<u8>,
    content_type: String,
    durability: Option<u32>,
    etag: String,
    mtime: String,
}

struct State {
    nodes: Mutex<BTreeMap<String, Node>>,
    etag_counter: AtomicU64,
}

/// Shared in-memory service; clones see the same tree
#[derive(Clone)]
pub struct InMemoryTransport {
    state: Arc<State>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                directory: true,
                data: Vec::new(),
                content_type: DIRECTORY_CONTENT_TYPE.to_string(),
                durability: None,
                etag: "root".to_string(),
                mtime: now_http_date(),
            },
        );
        Self {
            state: Arc::new(State {
                nodes: Mutex::new(nodes),
                etag_counter: AtomicU64::new(1),
            }),
        }
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored on the service for `path`, exactly as transmitted
    pub fn raw_bytes(&self, path: &ObjectPath) -> Option<Vec<u8>> {
        let nodes = self.state.nodes.lock().unwrap();
        nodes.get(&node_key(path)).map(|n| n.data.clone())
    }

    fn next_etag(&self) -> String {
        let n = self.state.etag_counter.fetch_add(1, Ordering::Relaxed);
        format!("etag-{n:08x}")
    }

    fn handle_put(
        &self,
        key: String,
        headers: &StorageHeaders,
        payload: Vec<u8>,
    ) -> Response {
        let content_type = headers
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let mut nodes = self.state.nodes.lock().unwrap();

        if key == "/" {
            return error_response(
                Method::Put,
                400,
                code::BAD_REQUEST,
                "cannot write to the root directory",
            );
        }
        match nodes.get(&parent_key(&key)) {
            Some(parent) if parent.directory => {}
            _ => {
                return error_response(
                    Method::Put,
                    400,
                    code::DIRECTORY_DOES_NOT_EXIST,
                    "parent directory does not exist",
                );
            }
        }

        if content_type == DIRECTORY_CONTENT_TYPE {
            match nodes.get(&key) {
                Some(existing) if existing.directory => {
                    return Response::empty(204, StorageHeaders::new());
                }
                Some(_) => {
                    return error_response(
                        Method::Put,
                        400,
                        code::BAD_REQUEST,
                        "an object already exists at this path",
                    );
                }
                None => {}
            }
            nodes.insert(
                key,
                Node {
                    directory: true,
                    data: Vec::new(),
                    content_type,
                    durability: None,
                    etag: self.next_etag(),
                    mtime: now_http_date(),
                },
            );
            return Response::empty(204, StorageHeaders::new());
        }

        if content_type == LINK_CONTENT_TYPE {
            let Some(location) = headers.first(LOCATION) else {
                return error_response(
                    Method::Put,
                    400,
                    code::BAD_REQUEST,
                    "link request without location header",
                );
            };
            let source_key = match ObjectPath::parse(location) {
                Ok(path) => node_key(&path),
                Err(_) => {
                    return error_response(
                        Method::Put,
                        400,
                        code::BAD_REQUEST,
                        "malformed link location",
                    );
                }
            };
            let source = match nodes.get(&source_key) {
                Some(node) if !node.directory => node.clone(),
                Some(_) => {
                    return error_response(
                        Method::Put,
                        400,
                        code::BAD_REQUEST,
                        "cannot link a directory",
                    );
                }
                None => {
                    return error_response(
                        Method::Put,
                        404,
                        code::RESOURCE_NOT_FOUND,
                        "link source does not exist",
                    );
                }
            };
            if nodes.get(&key).is_some_and(|n| n.directory) {
                return error_response(
                    Method::Put,
                    400,
                    code::BAD_REQUEST,
                    "a directory already exists at this path",
                );
            }
            nodes.insert(key, source);
            return Response::empty(204, StorageHeaders::new());
        }

        // Plain object write.
        if nodes.get(&key).is_some_and(|n| n.directory) {
            return error_response(
                Method::Put,
                400,
                code::BAD_REQUEST,
                "cannot overwrite a directory with an object",
            );
        }
        let node = Node {
            directory: false,
            data: payload,
            content_type,
            durability: headers.durability_level().or(Some(2)),
            etag: self.next_etag(),
            mtime: now_http_date(),
        };
        let mut response_headers = StorageHeaders::new();
        response_headers.set(ETAG, node.etag.clone());
        response_headers.set(LAST_MODIFIED, node.mtime.clone());
        nodes.insert(key, node);
        Response::empty(204, response_headers)
    }

    fn handle_read(&self, method: Method, key: String, query: &[(String, String)]) -> Response {
        let nodes = self.state.nodes.lock().unwrap();
        let Some(node) = nodes.get(&key) else {
            return error_response(method, 404, code::RESOURCE_NOT_FOUND, "no such object");
        };

        if !node.directory {
            let headers = node_headers(node, None);
            return match method {
                Method::Head => Response::empty(200, headers),
                _ => Response::with_bytes(200, headers, node.data.clone()),
            };
        }

        let children: Vec<(String, Node)> = nodes
            .iter()
            .filter_map(|(k, n)| child_name(&key, k).map(|name| (name, n.clone())))
            .collect();
        let headers = node_headers(node, Some(children.len()));
        if method == Method::Head {
            return Response::empty(200, headers);
        }

        let limit = query_param(query, "limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LIMIT);
        let marker = query_param(query, "marker");
        let mut body = String::new();
        for (name, child) in children
            .iter()
            .filter(|(name, _)| marker.is_none_or(|m| name.as_str() >= m))
            .take(limit)
        {
            body.push_str(&list_entry_json(name, child));
            body.push('\n');
        }
        Response::with_bytes(200, headers, body.into_bytes())
    }

    fn handle_delete(&self, key: String) -> Response {
        let mut nodes = self.state.nodes.lock().unwrap();
        if key == "/" {
            return error_response(
                Method::Delete,
                400,
                code::BAD_REQUEST,
                "cannot delete the root directory",
            );
        }
        let Some(node) = nodes.get(&key) else {
            return error_response(
                Method::Delete,
                404,
                code::RESOURCE_NOT_FOUND,
                "no such object",
            );
        };
        if node.directory {
            let has_children = nodes.keys().any(|k| child_name(&key, k).is_some());
            if has_children {
                return error_response(
                    Method::Delete,
                    400,
                    code::DIRECTORY_NOT_EMPTY,
                    "directory is not empty",
                );
            }
        }
        nodes.remove(&key);
        Response::empty(204, StorageHeaders::new())
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: Request) -> Result<Response> {
        let Request {
            method,
            path,
            query,
            headers,
            body,
        } = request;

        // Drain any streamed payload before taking the lock.
        let payload = match body {
            Body::Empty => Vec::new(),
            Body::Bytes(data) => data,
            Body::Stream { mut reader, .. } => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                buf
            }
        };

        let key = node_key(&path);
        let response = match method {
            Method::Put => self.handle_put(key, &headers, payload),
            Method::Get | Method::Head => self.handle_read(method, key, &query),
            Method::Delete => self.handle_delete(key),
        };
        Ok(response)
    }
}

fn now_http_date() -> String {
    let zoned = jiff::Timestamp::now().to_zoned(jiff::tz::TimeZone::UTC);
    jiff::fmt::rfc2822::to_string(&zoned).unwrap()
}

fn node_key(path: &ObjectPath) -> String {
    let segments: Vec<&str> = path.segments().collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

fn parent_key(key: &str) -> String {
    match key.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(pos) => key[..pos].to_string(),
    }
}

/// `Some(name)` iff `key` is an immediate child of directory `parent`
fn child_name(parent: &str, key: &str) -> Option<String> {
    let prefix = if parent == "/" {
        "/".to_string()
    } else {
        format!("{parent}/")
    };
    let rest = key.strip_prefix(prefix.as_str())?;
    if rest.is_empty() || rest.contains('/') {
        None
    } else {
        Some(rest.to_string())
    }
}

fn query_param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn list_entry_json(name: &str, node: &Node) -> String {
    let mut entry = serde_json::json!({
        "name": name,
        "type": if node.directory { "directory" } else { "object" },
        "etag": node.etag,
        "mtime": node.mtime,
    });
    if !node.directory {
        entry["size"] = serde_json::json!(node.data.len());
        if let Some(durability) = node.durability {
            entry["durability"] = serde_json::json!(durability);
        }
    }
    entry.to_string()
}

fn error_response(method: Method, status: u16, code: &str, message: &str) -> Response {
    if method == Method::Head {
        return Response::empty(status, StorageHeaders::new());
    }
    let body = serde_json::json!({ "code": code, "message": message }).to_string();
    Response::with_bytes(status, StorageHeaders::new(), body.into_bytes())
}

fn node_headers(node: &Node, children: Option<usize>) -> StorageHeaders {
    let mut headers = StorageHeaders::new();
    headers.set(CONTENT_TYPE, node.content_type.clone());
    headers.set(ETAG, node.etag.clone());
    headers.set(LAST_MODIFIED, node.mtime.clone());
    if node.directory {
        if let Some(count) = children {
            headers.set(RESULT_SET_SIZE, count.to_string());
        }
    } else {
        headers.set(CONTENT_LENGTH, node.data.len().to_string());
        if let Some(durability) = node.durability {
            headers.set(DURABILITY_LEVEL, durability.to_string());
        }
    }
    headers
}

/// Byte-wise XOR stream cipher for transparency tests
pub struct XorCipher {
    key: u8,
}

impl XorCipher {
    pub fn new(key: u8) -> Self {
        Self { key }
    }
}

impl ContentCipher for XorCipher {
    fn encrypt(&self, plaintext: BoxAsyncRead) -> BoxAsyncRead {
        Box::new(XorReader {
            inner: plaintext,
            key: self.key,
        })
    }

    fn decrypt(&self, ciphertext: BoxAsyncRead) -> BoxAsyncRead {
        Box::new(XorReader {
            inner: ciphertext,
            key: self.key,
        })
    }
}

struct XorReader {
    inner: BoxAsyncRead,
    key: u8,
}

impl AsyncRead for XorReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                for byte in &mut buf.filled_mut()[before..] {
                    *byte ^= this.key;
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
