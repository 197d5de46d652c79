//! Client configuration
//!
//! An opaque configuration object passed in at client construction.
//! Credential material and transport tuning (timeouts, retry policy) belong
//! to the transport implementation, not here.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::path::ObjectPath;

/// Configuration for a storage client instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base endpoint of the storage service
    pub endpoint: Url,

    /// Account name; the namespace root for this client is `/{account}`
    pub account: String,

    /// Durability level applied to writes that do not specify one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_durability: Option<u32>,
}

impl ClientConfig {
    pub fn new(endpoint: Url, account: impl Into<String>) -> Self {
        Self {
            endpoint,
            account: account.into(),
            default_durability: None,
        }
    }

    pub fn with_default_durability(mut self, level: u32) -> Self {
        self.default_durability = Some(level);
        self
    }

    /// The account's home directory path
    pub fn home(&self) -> ObjectPath {
        ObjectPath::root().join(&self.account)
    }
}
