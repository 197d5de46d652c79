//! shoal-core: Core types for the shoal object storage client
//!
//! This crate provides the transport-independent pieces of the client:
//! - Path model for the slash-separated storage namespace
//! - Header and object metadata models
//! - The typed error taxonomy and status/code classifier
//! - The `Transport` trait that concrete wire implementations plug into
//!
//! Keeping these separate from any concrete transport allows the operation
//! engine in shoal-client to be tested against in-memory transports.

pub mod config;
pub mod error;
pub mod headers;
pub mod object;
pub mod path;
pub mod transport;

pub use config::ClientConfig;
pub use error::{classify, code, ErrorContext, ObjectKind, Result, StorageError};
pub use headers::StorageHeaders;
pub use object::ObjectInfo;
pub use path::{ObjectPath, SEPARATOR};
pub use transport::{Body, BoxAsyncRead, Method, Request, Response, Transport};
