//! The object store facade consumed by the driver.
//!
//! The driver never speaks a wire protocol. It is handed an implementation of
//! [`ObjectStoreClient`], a flat key-value store with multipart uploads,
//! prefix listing, and optional URL signing. Keys are opaque strings; the
//! store has no notion of directories.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use http::Method;

use crate::error::{BackendError, BackendResult};

/// A stream of object content.
pub type ByteStream = BoxStream<'static, BackendResult<Bytes>>;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Time the object was last written.
    pub last_modified: DateTime<Utc>,
}

/// An in-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    /// Key the upload will create.
    pub key: String,
    /// Backend-assigned upload id.
    pub upload_id: String,
}

/// Receipt for one uploaded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartId {
    /// Part number, starting at 1.
    pub part_number: u32,
    /// Backend-assigned entity tag of the part.
    pub etag: String,
}

/// Opaque pagination token for [`ObjectStoreClient::list_by_prefix`].
///
/// Encodes the last key of the previous page; the next page starts strictly
/// after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor(String);

impl ListCursor {
    /// Cursor resuming after `key`.
    #[must_use]
    pub fn after(key: &str) -> Self {
        Self(BASE64_STANDARD.encode(key.as_bytes()))
    }

    /// The key this cursor resumes after.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] if the token is corrupt.
    pub fn last_key(&self) -> BackendResult<String> {
        let bytes = BASE64_STANDARD
            .decode(&self.0)
            .map_err(|e| BackendError::Internal(anyhow::anyhow!("invalid list cursor: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| BackendError::Internal(anyhow::anyhow!("invalid list cursor: {e}")))
    }
}

/// One page of a prefix listing, in ascending key order.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects on this page.
    pub entries: Vec<ObjectMeta>,
    /// Cursor for the next page, `None` on the last page.
    pub next_cursor: Option<ListCursor>,
}

/// Flat object store operations the driver is built on.
///
/// Implementations must be safe to call concurrently. Writes to a single key
/// are expected to be atomic: readers observe either the previous object or
/// the complete new one.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync + fmt::Debug {
    /// Stream the object content starting at `offset`.
    ///
    /// Returns [`BackendError::NotFound`] if the key does not exist.
    async fn get(&self, key: &str, offset: u64) -> BackendResult<ByteStream>;

    /// Fetch object metadata.
    ///
    /// Returns [`BackendError::NotFound`] if the key does not exist.
    async fn stat_key(&self, key: &str) -> BackendResult<ObjectMeta>;

    /// Store `data` at `key` in a single request, replacing any object.
    async fn put_small(&self, key: &str, data: Bytes) -> BackendResult<()>;

    /// Start a multipart upload that will create `key`.
    async fn begin_multipart(&self, key: &str) -> BackendResult<UploadHandle>;

    /// Upload one part of a multipart upload.
    async fn upload_part(
        &self,
        handle: &UploadHandle,
        part_number: u32,
        data: Bytes,
    ) -> BackendResult<PartId>;

    /// Atomically assemble `parts`, in order, into the target object.
    async fn complete_multipart(
        &self,
        handle: &UploadHandle,
        parts: &[PartId],
    ) -> BackendResult<()>;

    /// Abandon a multipart upload and discard its parts.
    async fn abort_multipart(&self, handle: &UploadHandle) -> BackendResult<()>;

    /// Delete the object at `key`.
    ///
    /// Returns [`BackendError::NotFound`] if the key does not exist.
    async fn delete(&self, key: &str) -> BackendResult<()>;

    /// List objects whose key starts with `prefix`, one page at a time.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        cursor: Option<&ListCursor>,
    ) -> BackendResult<ListPage>;

    /// Produce a URL granting `method` access to `key` for `expires_in`.
    ///
    /// The default implementation reports [`BackendError::Unsupported`].
    async fn sign_url(
        &self,
        key: &str,
        method: &Method,
        expires_in: Duration,
    ) -> BackendResult<String> {
        let _ = (key, method, expires_in);
        Err(BackendError::Unsupported)
    }
}
