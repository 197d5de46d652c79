//! Object metadata model
//!
//! An [`ObjectInfo`] is an immutable snapshot of one remote node, built from
//! the header set of a successful head/get/put or from one listing entry.

use jiff::fmt::rfc2822::DateTimeParser;
use jiff::Timestamp;

use crate::headers::{self, StorageHeaders};
use crate::path::ObjectPath;

static MTIME_PARSER: DateTimeParser = DateTimeParser::new();

/// Metadata snapshot of a remote file or directory
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    path: ObjectPath,
    headers: StorageHeaders,
}

impl ObjectInfo {
    /// Construct from a response header set
    pub fn from_headers(path: ObjectPath, headers: StorageHeaders) -> Self {
        Self { path, headers }
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// The full header set as received, caller-supplied headers included
    pub fn headers(&self) -> &StorageHeaders {
        &self.headers
    }

    /// True iff the node's resource type marks a directory
    pub fn is_directory(&self) -> bool {
        self.headers
            .content_type()
            .is_some_and(|ct| ct == headers::DIRECTORY_CONTENT_TYPE)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// Byte length; present for files, absent for directories
    pub fn content_length(&self) -> Option<u64> {
        self.headers.content_length()
    }

    /// Opaque version token assigned at creation
    pub fn etag(&self) -> Option<&str> {
        self.headers.etag()
    }

    /// The protocol-formatted modification time string, unparsed
    pub fn mtime(&self) -> Option<&str> {
        self.headers.mtime()
    }

    /// The modification time as an absolute timestamp
    ///
    /// `None` when the mtime header is absent or unparseable; a malformed
    /// value degrades to absent rather than failing.
    pub fn last_modified(&self) -> Option<Timestamp> {
        let mtime = self.headers.mtime()?;
        MTIME_PARSER.parse_timestamp(mtime).ok()
    }

    pub fn durability_level(&self) -> Option<u32> {
        self.headers.durability_level()
    }

    /// Immediate child count, reported on directory heads
    pub fn result_set_size(&self) -> Option<u64> {
        self.headers.result_set_size()
    }
}
