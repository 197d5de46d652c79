//! Error types for shoal operations
//!
//! Every failed remote call is mapped to exactly one variant of
//! [`StorageError`] by [`classify`]. The raw service error code and any
//! contextual key/value pairs survive classification so callers can inspect
//! them without losing the typed kind.

use thiserror::Error;

/// Result type alias for shoal operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Well-known service error code strings
pub mod code {
    /// The target path does not exist
    pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFound";
    /// A destination or parent directory does not exist
    pub const DIRECTORY_DOES_NOT_EXIST: &str = "DirectoryDoesNotExist";
    /// A directory cannot be deleted while it has children
    pub const DIRECTORY_NOT_EMPTY: &str = "DirectoryNotEmpty";
    /// Generic malformed or semantically invalid request
    pub const BAD_REQUEST: &str = "BadRequest";
}

/// Ordered contextual key/value pairs attached to a classified error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    entries: Vec<(String, String)>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a key/value pair, keeping insertion order
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The kind of node an operation expected to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Directory,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::File => write!(f, "file"),
            ObjectKind::Directory => write!(f, "directory"),
        }
    }
}

/// Error types for shoal operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Target path does not exist
    #[error("Not found: {path}")]
    NotFound { path: String, context: ErrorContext },

    /// Malformed or semantically invalid request (status-400 class)
    #[error("Request rejected (status {status}): {message}")]
    RequestRejected {
        status: u16,
        server_code: Option<String>,
        message: String,
        context: ErrorContext,
    },

    /// Operation requires one object kind but found the other
    #[error("{path} is not a {expected}")]
    TypeMismatch { path: String, expected: ObjectKind },

    /// Connection or wire-level failure unrelated to service semantics
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other service-reported error
    #[error("Service error (status {status}): {message}")]
    Service {
        status: u16,
        server_code: Option<String>,
        message: String,
        context: ErrorContext,
    },
}

impl StorageError {
    /// The raw service error code string, if the service reported one
    pub fn server_code(&self) -> Option<&str> {
        match self {
            StorageError::NotFound { context, .. } => context.get("serverCode"),
            StorageError::RequestRejected { server_code, .. }
            | StorageError::Service { server_code, .. } => server_code.as_deref(),
            _ => None,
        }
    }

    /// The transport status code, for classified service responses
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::RequestRejected { status, .. }
            | StorageError::Service { status, .. } => Some(*status),
            StorageError::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Contextual key/value pairs captured at classification time
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            StorageError::NotFound { context, .. }
            | StorageError::RequestRejected { context, .. }
            | StorageError::Service { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Map a transport status code plus optional service error code into the
/// typed taxonomy.
///
/// Pure function of its inputs; retry decisions belong to layers above.
/// The service code, when present, is also recorded in the context under
/// `serverCode` so every variant exposes it uniformly.
pub fn classify(
    status: u16,
    server_code: Option<&str>,
    message: impl Into<String>,
    mut context: ErrorContext,
) -> StorageError {
    let message = message.into();
    if let Some(code) = server_code {
        context.push("serverCode", code);
    }

    // A missing destination directory is a rejected request even when the
    // service reports it with a 404 status.
    if server_code == Some(code::DIRECTORY_DOES_NOT_EXIST) {
        return StorageError::RequestRejected {
            status,
            server_code: server_code.map(str::to_owned),
            message,
            context,
        };
    }

    if status == 404 && server_code.is_none_or(|c| c == code::RESOURCE_NOT_FOUND) {
        let path = context.get("path").unwrap_or_default().to_string();
        return StorageError::NotFound { path, context };
    }

    if (400..500).contains(&status) {
        return StorageError::RequestRejected {
            status,
            server_code: server_code.map(str::to_owned),
            message,
            context,
        };
    }

    StorageError::Service {
        status,
        server_code: server_code.map(str::to_owned),
        message,
        context,
    }
}
