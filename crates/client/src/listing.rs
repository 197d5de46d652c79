//! Lazy, paginated directory enumeration
//!
//! A listing fetches one page of newline-delimited JSON entries at a time,
//! advancing a name marker between pages. Each immediate child is yielded
//! exactly once in page order; stopping early just drops the listing and
//! leaks nothing.

use std::collections::VecDeque;

use futures::Stream;
use serde::Deserialize;
use tokio::io::AsyncReadExt;

use shoal_core::headers::{
    CONTENT_LENGTH, CONTENT_TYPE, DIRECTORY_CONTENT_TYPE, DURABILITY_LEVEL, ETAG, LAST_MODIFIED,
};
use shoal_core::{
    Method, ObjectInfo, ObjectKind, ObjectPath, Request, Result, StorageError, StorageHeaders,
    Transport,
};

use crate::client::StorageClient;

/// Entries requested per page
pub(crate) const DEFAULT_PAGE_SIZE: usize = 256;

/// One wire entry of a directory listing page
#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    etag: Option<String>,
    size: Option<u64>,
    mtime: Option<String>,
    durability: Option<u32>,
}

impl ListEntry {
    fn into_info(self, dir: &ObjectPath) -> ObjectInfo {
        let mut headers = StorageHeaders::new();
        if self.kind == "directory" {
            headers.set(CONTENT_TYPE, DIRECTORY_CONTENT_TYPE);
        }
        if let Some(etag) = self.etag {
            headers.set(ETAG, etag);
        }
        if let Some(size) = self.size {
            headers.set(CONTENT_LENGTH, size.to_string());
        }
        if let Some(mtime) = self.mtime {
            headers.set(LAST_MODIFIED, mtime);
        }
        if let Some(durability) = self.durability {
            headers.set(DURABILITY_LEVEL, durability.to_string());
        }
        ObjectInfo::from_headers(dir.join(&self.name), headers)
    }
}

/// Forward-only enumeration of one directory's immediate children
pub struct DirectoryListing<T: Transport> {
    client: StorageClient<T>,
    dir: ObjectPath,
    page_size: usize,
    page: VecDeque<ObjectInfo>,
    marker: Option<String>,
    exhausted: bool,
}

impl<T: Transport> DirectoryListing<T> {
    /// Fetch the first page so type and existence errors surface before
    /// any element is yielded
    pub(crate) async fn open(
        client: StorageClient<T>,
        dir: &ObjectPath,
        page_size: usize,
    ) -> Result<Self> {
        let mut listing = Self {
            client,
            dir: dir.clone(),
            page_size: page_size.max(1),
            page: VecDeque::new(),
            marker: None,
            exhausted: false,
        };
        listing.fetch_page().await?;
        Ok(listing)
    }

    pub fn path(&self) -> &ObjectPath {
        &self.dir
    }

    /// The next child entry, or `None` once the directory is exhausted
    pub async fn next(&mut self) -> Result<Option<ObjectInfo>> {
        while self.page.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.page.pop_front())
    }

    /// Adapt into a `futures::Stream` of entries
    pub fn into_stream(self) -> impl Stream<Item = Result<ObjectInfo>> {
        futures::stream::try_unfold(self, |mut listing| async move {
            Ok(listing.next().await?.map(|entry| (entry, listing)))
        })
    }

    async fn fetch_page(&mut self) -> Result<()> {
        // The marker entry is inclusive and re-sent at the head of each
        // page after the first, so those pages request one extra slot to
        // guarantee forward progress at any page size.
        let limit = match &self.marker {
            Some(_) => self.page_size + 1,
            None => self.page_size,
        };
        let mut request = Request::get(self.dir.clone()).query("limit", limit.to_string());
        if let Some(marker) = &self.marker {
            request = request.query("marker", marker.clone());
        }

        let response = self.client.send(request).await?;
        let response = self.client.check(response, Method::Get, &self.dir).await?;

        // GET of a file succeeds but returns the file body, not a listing.
        if response.headers.content_type() != Some(DIRECTORY_CONTENT_TYPE) {
            return Err(StorageError::TypeMismatch {
                path: self.dir.to_string(),
                expected: ObjectKind::Directory,
            });
        }

        let mut body = response.body;
        let mut buf = Vec::new();
        body.read_to_end(&mut buf).await?;

        let previous_marker = self.marker.clone();
        let mut fetched = 0usize;
        let mut pushed = 0usize;
        let mut last_name: Option<String> = None;
        for line in buf.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let entry: ListEntry = serde_json::from_slice(line).map_err(|e| {
                StorageError::Transport(format!("malformed listing entry: {e}"))
            })?;
            fetched += 1;
            last_name = Some(entry.name.clone());
            // Skip the echoed marker entry.
            if self.marker.as_deref() == Some(entry.name.as_str()) {
                continue;
            }
            self.page.push_back(entry.into_info(&self.dir));
            pushed += 1;
        }

        if last_name.is_some() {
            self.marker = last_name;
        }
        // A short page ends the enumeration; a full page that made no
        // progress past the marker would mean the service ignored the
        // requested limit, so stop rather than loop.
        if fetched < limit || (pushed == 0 && self.marker == previous_marker) {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for DirectoryListing<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryListing")
            .field("dir", &self.dir.as_str())
            .field("buffered", &self.page.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
