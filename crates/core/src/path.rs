//! Path model for the storage namespace
//!
//! Paths are slash-separated and anchored at the account root
//! (e.g. `/account/stor/reports/2026/q1.csv`). A trailing separator carries
//! directory intent for operations that accept it (move-into-directory).
//!
//! Comparisons are normalization-aware: duplicate separators and a trailing
//! separator do not distinguish two paths naming the same node. The original
//! spelling is preserved for the wire.

use std::hash::{Hash, Hasher};

use crate::error::{Result, StorageError};

/// The namespace separator character
pub const SEPARATOR: char = '/';

/// A validated path in the storage namespace
#[derive(Debug, Clone)]
pub struct ObjectPath {
    raw: String,
}

impl ObjectPath {
    /// Validate and wrap a raw path string
    ///
    /// Rejects empty input. Segment content is otherwise unrestricted
    /// (spaces and RFC 3986-significant characters are legal); any
    /// percent-encoding is the transport's concern.
    pub fn parse(input: impl Into<String>) -> Result<Self> {
        let raw = input.into();
        if raw.is_empty() {
            return Err(StorageError::InvalidPath("path cannot be empty".into()));
        }
        if raw.contains('\0') {
            return Err(StorageError::InvalidPath(
                "path cannot contain NUL bytes".into(),
            ));
        }
        Ok(Self { raw })
    }

    /// The namespace root `/`
    pub fn root() -> Self {
        Self {
            raw: SEPARATOR.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Non-empty path segments, in order
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.raw.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// True iff the path names the namespace root
    pub fn is_root(&self) -> bool {
        self.segments().next().is_none()
    }

    /// True iff the path was spelled with a trailing separator
    /// (directory intent for move-into-directory)
    pub fn ends_with_separator(&self) -> bool {
        !self.is_root() && self.raw.ends_with(SEPARATOR)
    }

    /// The final segment, if any
    pub fn file_name(&self) -> Option<&str> {
        self.segments().next_back()
    }

    /// Append a child component
    ///
    /// `child` may itself contain separators to join a subpath in one step.
    pub fn join(&self, child: &str) -> Self {
        let base = self.raw.trim_end_matches(SEPARATOR);
        let child = child.trim_start_matches(SEPARATOR);
        Self {
            raw: format!("{base}{SEPARATOR}{child}"),
        }
    }

    /// The path one level up, or `None` at the root
    pub fn parent(&self) -> Option<Self> {
        let segments: Vec<&str> = self.segments().collect();
        if segments.is_empty() {
            return None;
        }
        if segments.len() == 1 {
            return Some(Self::root());
        }
        let raw = format!(
            "{SEPARATOR}{}",
            segments[..segments.len() - 1].join("/")
        );
        Some(Self { raw })
    }

    /// All ancestors from the root's first child down to `self`'s parent
    ///
    /// The root itself is excluded. Used to create missing parent
    /// directories top-down.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            chain.push(path);
        }
        chain.reverse();
        chain
    }
}

impl PartialEq for ObjectPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments().eq(other.segments())
    }
}

impl Eq for ObjectPath {}

impl Hash for ObjectPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for segment in self.segments() {
            segment.hash(state);
        }
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for ObjectPath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
