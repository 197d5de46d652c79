//! Header model
//!
//! An ordered header mapping with case-insensitive name lookup and typed
//! accessors for the headers the client interprets. Caller-supplied headers
//! are carried verbatim and the service echoes them back on head/get.

/// Standard header names
pub const CONTENT_TYPE: &str = "content-type";
pub const CONTENT_LENGTH: &str = "content-length";
pub const ETAG: &str = "etag";
pub const LAST_MODIFIED: &str = "last-modified";
pub const LOCATION: &str = "location";

/// Service-specific header names
pub const DURABILITY_LEVEL: &str = "durability-level";
pub const RESULT_SET_SIZE: &str = "result-set-size";

/// Content type marking a directory node
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-json-stream; type=directory";
/// Content type of a rename-link PUT
pub const LINK_CONTENT_TYPE: &str = "application/json; type=link";

/// Ordered header name/value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageHeaders {
    entries: Vec<(String, String)>,
}

impl StorageHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing an existing entry of the same
    /// (case-insensitive) name or appending a new one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    /// First value under `name`, case-insensitive
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    /// Copy every entry of `other` into `self`, overwriting collisions
    pub fn extend(&mut self, other: &StorageHeaders) {
        for (name, value) in &other.entries {
            self.set(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.first(CONTENT_TYPE)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.first(CONTENT_LENGTH)?.parse().ok()
    }

    pub fn etag(&self) -> Option<&str> {
        self.first(ETAG)
    }

    /// The raw `last-modified` value, unparsed
    pub fn mtime(&self) -> Option<&str> {
        self.first(LAST_MODIFIED)
    }

    pub fn durability_level(&self) -> Option<u32> {
        self.first(DURABILITY_LEVEL)?.parse().ok()
    }

    /// Immediate child count of a directory, as reported by the service
    pub fn result_set_size(&self) -> Option<u64> {
        self.first(RESULT_SET_SIZE)?.parse().ok()
    }

    pub fn set_content_type(&mut self, value: impl Into<String>) {
        self.set(CONTENT_TYPE, value);
    }

    pub fn set_durability_level(&mut self, level: u32) {
        self.set(DURABILITY_LEVEL, level.to_string());
    }
}

impl FromIterator<(String, String)> for StorageHeaders {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
