//! shoal-client: Operation engine for the shoal object storage client
//!
//! Built on the `Transport` seam from shoal-core, this crate provides:
//! - CRUD operations (put/get/head/delete) with streaming and file adapters
//! - Directory tree algorithms (recursive delete, move, parent creation)
//! - Lazy, paginated directory listing
//! - Optional transparent client-side encryption of object bodies

pub mod client;
pub mod crypto;
pub mod listing;
pub mod stream;

mod directory;

pub use client::StorageClient;
pub use crypto::ContentCipher;
pub use listing::DirectoryListing;
pub use stream::{ObjectReader, ObjectWriter};
