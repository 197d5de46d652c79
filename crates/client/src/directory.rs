//! Directory tree operations
//!
//! These operate on subtrees through multiple remote calls with no
//! cross-call transaction: a failure partway through `delete_recursive` or
//! a directory move leaves the already-applied changes in place, and the
//! first error encountered propagates. The final state of a subtree under
//! concurrent mutation by other clients is the service's concern.

use futures::future::{BoxFuture, FutureExt};

use shoal_core::headers::{DIRECTORY_CONTENT_TYPE, LINK_CONTENT_TYPE, LOCATION};
use shoal_core::{
    code, Method, ObjectKind, ObjectPath, Request, Result, StorageError, Transport,
};

use crate::client::StorageClient;

impl<T: Transport> StorageClient<T> {
    /// Create a single directory node
    ///
    /// Idempotent: creating an existing directory succeeds. Fails with a
    /// rejected request when the parent is missing.
    pub async fn put_directory(&self, path: &ObjectPath) -> Result<()> {
        let request = Request::put(path.clone())
            .header(shoal_core::headers::CONTENT_TYPE, DIRECTORY_CONTENT_TYPE);
        let response = self.send(request).await?;
        self.check(response, Method::Put, path).await?;
        Ok(())
    }

    /// Create a directory and any missing ancestors, root-down
    pub async fn put_directory_all(&self, path: &ObjectPath) -> Result<()> {
        for ancestor in path.ancestors() {
            self.put_directory(&ancestor).await?;
        }
        self.put_directory(path).await
    }

    /// True iff the directory at `path` has no children
    ///
    /// Fails with `TypeMismatch` when `path` is not a directory.
    pub async fn is_directory_empty(&self, path: &ObjectPath) -> Result<bool> {
        let info = self.head(path).await?;
        if !info.is_directory() {
            return Err(StorageError::TypeMismatch {
                path: path.to_string(),
                expected: ObjectKind::Directory,
            });
        }
        if let Some(children) = info.result_set_size() {
            return Ok(children == 0);
        }
        // No result-set-size header; fall back to probing the first entry.
        let mut listing = self.list_objects_paged(path, 1).await?;
        Ok(listing.next().await?.is_none())
    }

    /// True iff `head(path)` succeeds; `false` on NotFound, any other
    /// failure propagates
    pub async fn exists_and_is_accessible(&self, path: &ObjectPath) -> Result<bool> {
        match self.head(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Delete `path` and, when it is a non-empty directory, everything
    /// beneath it depth-first
    ///
    /// Not atomic: an error partway leaves a partially-deleted subtree.
    pub async fn delete_recursive(&self, path: &ObjectPath) -> Result<()> {
        self.delete_tree(path).await
    }

    fn delete_tree<'a>(&'a self, path: &'a ObjectPath) -> BoxFuture<'a, Result<()>> {
        async move {
            match self.delete(path).await {
                Ok(()) => return Ok(()),
                Err(err) if err.server_code() == Some(code::DIRECTORY_NOT_EMPTY) => {}
                Err(err) => return Err(err),
            }

            let mut listing = self.list_objects(path).await?;
            while let Some(child) = listing.next().await? {
                if child.is_directory() {
                    self.delete_tree(child.path()).await?;
                } else {
                    self.delete(child.path()).await?;
                }
            }

            tracing::debug!(path = %path, "removing emptied directory");
            self.delete(path).await
        }
        .boxed()
    }

    /// Move the node at `src` to `dst`
    ///
    /// A file is renamed at the service boundary (link then delete); a
    /// directory move relocates the whole subtree and leaves nothing at the
    /// source. A file `dst` spelled with a trailing separator means "into
    /// that directory under the source's name"; for a directory move the
    /// trailing separator is insignificant, `dst` names the new directory.
    /// With `create_parent_dirs` false, a missing destination parent
    /// surfaces the service's `DirectoryDoesNotExist` code through the
    /// classified error.
    pub async fn move_object(
        &self,
        src: &ObjectPath,
        dst: &ObjectPath,
        create_parent_dirs: bool,
    ) -> Result<()> {
        let info = self.head(src).await?;
        if info.is_directory() {
            return self.move_directory(src, dst, create_parent_dirs).await;
        }

        let dst = if dst.ends_with_separator() {
            let name = src.file_name().ok_or_else(|| {
                StorageError::InvalidPath("cannot move the root directory".into())
            })?;
            dst.join(name)
        } else {
            dst.clone()
        };
        self.move_file(src, &dst, create_parent_dirs).await
    }

    /// Service-side rename of one file: link the destination to the source,
    /// then delete the source
    async fn move_file(
        &self,
        src: &ObjectPath,
        dst: &ObjectPath,
        create_parent_dirs: bool,
    ) -> Result<()> {
        match self.put_link(dst, src).await {
            Ok(()) => {}
            Err(err)
                if create_parent_dirs
                    && err.server_code() == Some(code::DIRECTORY_DOES_NOT_EXIST) =>
            {
                if let Some(parent) = dst.parent() {
                    self.put_directory_all(&parent).await?;
                }
                self.put_link(dst, src).await?;
            }
            Err(err) => return Err(err),
        }
        self.delete(src).await
    }

    fn move_directory<'a>(
        &'a self,
        src: &'a ObjectPath,
        dst: &'a ObjectPath,
        create_parent_dirs: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if create_parent_dirs {
                self.put_directory_all(dst).await?;
            } else {
                self.put_directory(dst).await?;
            }

            let mut listing = self.list_objects(src).await?;
            while let Some(child) = listing.next().await? {
                let Some(name) = child.path().file_name() else {
                    continue;
                };
                let target = dst.join(name);
                if child.is_directory() {
                    self.move_directory(child.path(), &target, create_parent_dirs)
                        .await?;
                } else {
                    self.move_file(child.path(), &target, create_parent_dirs)
                        .await?;
                }
            }

            self.delete(src).await
        }
        .boxed()
    }

    async fn put_link(&self, dst: &ObjectPath, src: &ObjectPath) -> Result<()> {
        let request = Request::put(dst.clone())
            .header(shoal_core::headers::CONTENT_TYPE, LINK_CONTENT_TYPE)
            .header(LOCATION, src.as_str());
        let response = self.send(request).await?;
        self.check(response, Method::Put, dst).await?;
        Ok(())
    }
}
