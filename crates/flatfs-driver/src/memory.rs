//! In-memory object store.
//!
//! [`InMemoryObjectStore`] implements [`ObjectStoreClient`] entirely in
//! process. Keys live in a [`BTreeMap`] so prefix listings come back sorted
//! and paginate by "start after the last key", the same contract a real
//! flat store offers. Multipart uploads are staged in a [`DashMap`] and only
//! become visible when completed, which gives the per-key atomicity the
//! driver relies on.
//!
//! Failures can be injected per key with [`InMemoryObjectStore::inject_fault`]
//! to exercise the driver's error paths.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use flatfs_auth::{UrlSigningKey, presign_url};
use futures::StreamExt;
use http::Method;
use md5::{Digest, Md5};
use parking_lot::RwLock;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::client::{
    ByteStream, ListCursor, ListPage, ObjectMeta, ObjectStoreClient, PartId, UploadHandle,
};
use crate::error::{BackendError, BackendResult};

/// Default number of entries per listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Default size of the chunks a read stream yields.
const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1024;

/// Base URL used for signed URLs when none is configured.
const DEFAULT_BASE_URL: &str = "https://objects.localhost";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tuning knobs for [`InMemoryObjectStore`].
///
/// # Examples
///
/// ```
/// use flatfs_driver::memory::MemoryStoreOptions;
///
/// let options = MemoryStoreOptions::builder().page_size(2).build();
/// assert_eq!(options.page_size, 2);
/// assert!(options.signing_key.is_none());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct MemoryStoreOptions {
    /// Maximum number of entries per listing page.
    #[builder(default = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Size of the chunks a read stream yields.
    #[builder(default = DEFAULT_READ_CHUNK_SIZE)]
    pub read_chunk_size: usize,

    /// Base URL that signed URLs point at.
    #[builder(default = String::from(DEFAULT_BASE_URL))]
    pub base_url: String,

    /// Key used to sign URLs; URL signing is unsupported without one.
    #[builder(default, setter(strip_option))]
    pub signing_key: Option<UrlSigningKey>,
}

impl Default for MemoryStoreOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Operation that an injected fault makes fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// [`ObjectStoreClient::get`] on the key.
    Get,
    /// [`ObjectStoreClient::put_small`] on the key.
    Put,
    /// [`ObjectStoreClient::upload_part`] for an upload targeting the key.
    UploadPart,
    /// [`ObjectStoreClient::complete_multipart`] for an upload targeting the key.
    Complete,
    /// [`ObjectStoreClient::delete`] on the key.
    Delete,
    /// [`ObjectStoreClient::list_by_prefix`] with the key as prefix.
    List,
}

// ---------------------------------------------------------------------------
// Stored state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn new(data: Bytes) -> Self {
        Self {
            etag: compute_md5(&data),
            data,
            last_modified: Utc::now(),
        }
    }

    fn meta(&self, key: &str) -> ObjectMeta {
        ObjectMeta {
            key: key.to_owned(),
            size: self.data.len() as u64,
            last_modified: self.last_modified,
        }
    }
}

#[derive(Debug)]
struct PendingUpload {
    key: String,
    parts: BTreeMap<u32, StoredObject>,
}

// ---------------------------------------------------------------------------
// InMemoryObjectStore
// ---------------------------------------------------------------------------

/// Thread-safe in-memory [`ObjectStoreClient`].
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use flatfs_driver::client::ObjectStoreClient;
/// use flatfs_driver::memory::InMemoryObjectStore;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryObjectStore::default();
/// store.put_small("a/b", Bytes::from("hello")).await.unwrap();
///
/// let meta = store.stat_key("a/b").await.unwrap();
/// assert_eq!(meta.size, 5);
///
/// let page = store.list_by_prefix("a/", None).await.unwrap();
/// assert_eq!(page.entries.len(), 1);
/// assert!(page.next_cursor.is_none());
/// # });
/// ```
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    uploads: DashMap<String, PendingUpload>,
    faults: DashSet<(Fault, String)>,
    options: MemoryStoreOptions,
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects_count", &self.objects.read().len())
            .field("uploads_count", &self.uploads.len())
            .field("page_size", &self.options.page_size)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new(MemoryStoreOptions::default())
    }
}

impl InMemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(options: MemoryStoreOptions) -> Self {
        debug!(
            page_size = options.page_size,
            signing = options.signing_key.is_some(),
            "creating InMemoryObjectStore"
        );
        Self {
            objects: RwLock::new(BTreeMap::new()),
            uploads: DashMap::new(),
            faults: DashSet::new(),
            options,
        }
    }

    /// Make `op` fail for `key` until the fault is cleared.
    pub fn inject_fault(&self, op: Fault, key: impl Into<String>) {
        self.faults.insert((op, key.into()));
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    /// Whether an object exists at `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// All stored keys, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    /// Number of multipart uploads neither completed nor aborted.
    #[must_use]
    pub fn pending_uploads(&self) -> usize {
        self.uploads.len()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn check_fault(&self, op: Fault, key: &str) -> BackendResult<()> {
        if self.faults.contains(&(op, key.to_owned())) {
            trace!(?op, key, "injected fault");
            return Err(BackendError::Internal(anyhow::anyhow!(
                "injected {op:?} failure for {key}"
            )));
        }
        Ok(())
    }

    fn chunked(&self, data: Bytes) -> ByteStream {
        let chunk_size = self.options.read_chunk_size.max(1);
        let len = data.len();
        let chunks: Vec<BackendResult<Bytes>> = (0..len)
            .step_by(chunk_size)
            .map(|start| Ok(data.slice(start..(start + chunk_size).min(len))))
            .collect();
        futures::stream::iter(chunks).boxed()
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryObjectStore {
    async fn get(&self, key: &str, offset: u64) -> BackendResult<ByteStream> {
        self.check_fault(Fault::Get, key)?;
        let data = self
            .objects
            .read()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_owned(),
            })?;

        let start = usize::try_from(offset)
            .ok()
            .filter(|start| *start <= data.len())
            .ok_or_else(|| {
                BackendError::Internal(anyhow::anyhow!(
                    "offset {offset} beyond end of {key} ({} bytes)",
                    data.len()
                ))
            })?;

        trace!(key, offset, size = data.len(), "reading object");
        Ok(self.chunked(data.slice(start..)))
    }

    async fn stat_key(&self, key: &str) -> BackendResult<ObjectMeta> {
        self.objects
            .read()
            .get(key)
            .map(|o| o.meta(key))
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_owned(),
            })
    }

    async fn put_small(&self, key: &str, data: Bytes) -> BackendResult<()> {
        self.check_fault(Fault::Put, key)?;
        let size = data.len();
        self.objects
            .write()
            .insert(key.to_owned(), StoredObject::new(data));
        trace!(key, size, "stored object");
        Ok(())
    }

    async fn begin_multipart(&self, key: &str) -> BackendResult<UploadHandle> {
        let upload_id = Uuid::new_v4().to_string();
        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        debug!(key, upload_id = %upload_id, "began multipart upload");
        Ok(UploadHandle {
            key: key.to_owned(),
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        handle: &UploadHandle,
        part_number: u32,
        data: Bytes,
    ) -> BackendResult<PartId> {
        self.check_fault(Fault::UploadPart, &handle.key)?;
        if part_number == 0 {
            return Err(BackendError::InvalidPart { part_number });
        }
        let mut upload = self
            .uploads
            .get_mut(&handle.upload_id)
            .filter(|upload| upload.key == handle.key)
            .ok_or_else(|| BackendError::NoSuchUpload {
                upload_id: handle.upload_id.clone(),
            })?;

        let part = StoredObject::new(data);
        let etag = part.etag.clone();
        trace!(
            upload_id = %handle.upload_id,
            part_number,
            size = part.data.len(),
            "stored part"
        );
        upload.parts.insert(part_number, part);
        Ok(PartId { part_number, etag })
    }

    async fn complete_multipart(
        &self,
        handle: &UploadHandle,
        parts: &[PartId],
    ) -> BackendResult<()> {
        self.check_fault(Fault::Complete, &handle.key)?;

        let combined = {
            let upload = self
                .uploads
                .get(&handle.upload_id)
                .filter(|upload| upload.key == handle.key)
                .ok_or_else(|| BackendError::NoSuchUpload {
                    upload_id: handle.upload_id.clone(),
                })?;

            let mut combined = BytesMut::new();
            let mut previous = 0;
            for part in parts {
                let stored = upload
                    .parts
                    .get(&part.part_number)
                    .filter(|stored| stored.etag == part.etag && part.part_number > previous)
                    .ok_or(BackendError::InvalidPart {
                        part_number: part.part_number,
                    })?;
                combined.extend_from_slice(&stored.data);
                previous = part.part_number;
            }
            combined.freeze()
        };

        let size = combined.len();
        self.objects
            .write()
            .insert(handle.key.clone(), StoredObject::new(combined));
        self.uploads.remove(&handle.upload_id);

        debug!(
            key = %handle.key,
            upload_id = %handle.upload_id,
            size,
            parts = parts.len(),
            "completed multipart upload"
        );
        Ok(())
    }

    async fn abort_multipart(&self, handle: &UploadHandle) -> BackendResult<()> {
        self.uploads
            .remove(&handle.upload_id)
            .map(|_| trace!(upload_id = %handle.upload_id, "aborted multipart upload"))
            .ok_or_else(|| BackendError::NoSuchUpload {
                upload_id: handle.upload_id.clone(),
            })
    }

    async fn delete(&self, key: &str) -> BackendResult<()> {
        self.check_fault(Fault::Delete, key)?;
        self.objects
            .write()
            .remove(key)
            .map(|_| trace!(key, "deleted object"))
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_owned(),
            })
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        cursor: Option<&ListCursor>,
    ) -> BackendResult<ListPage> {
        self.check_fault(Fault::List, prefix)?;

        let start = match cursor {
            Some(cursor) => {
                let last = cursor.last_key()?;
                if last.as_str() >= prefix {
                    Bound::Excluded(last)
                } else {
                    Bound::Included(prefix.to_owned())
                }
            }
            None => Bound::Included(prefix.to_owned()),
        };

        let objects = self.objects.read();
        let mut matching = objects
            .range::<String, _>((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix));

        let entries: Vec<ObjectMeta> = matching
            .by_ref()
            .take(self.options.page_size.max(1))
            .map(|(key, object)| object.meta(key))
            .collect();
        let next_cursor = if matching.next().is_some() {
            entries.last().map(|meta| ListCursor::after(&meta.key))
        } else {
            None
        };

        trace!(prefix, entries = entries.len(), more = next_cursor.is_some(), "listed page");
        Ok(ListPage {
            entries,
            next_cursor,
        })
    }

    async fn sign_url(
        &self,
        key: &str,
        method: &Method,
        expires_in: Duration,
    ) -> BackendResult<String> {
        let signing_key = self
            .options
            .signing_key
            .as_ref()
            .ok_or(BackendError::Unsupported)?;
        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| BackendError::Internal(anyhow::anyhow!("invalid expiry: {e}")))?;

        presign_url(
            &self.options.base_url,
            &format!("/{key}"),
            method,
            Utc::now() + ttl,
            signing_key,
        )
        .map_err(|e| BackendError::Internal(e.into()))
    }
}

/// Hex-encoded MD5 digest of `data`, used as the entity tag.
fn compute_md5(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
