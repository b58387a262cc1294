//! Streaming, resumable writer with atomic commit.
//!
//! An [`ObjectWriter`] buffers written bytes and ships them to the object
//! store as multipart parts of `chunk_size` bytes. Nothing becomes visible at
//! the target path until [`FileWriter::commit`] completes the upload in a
//! single call, so readers observe either the previous object or the whole
//! new one.
//!
//! ```text
//! Open --write--> Writing --commit--> Committed
//!   \               |
//!    `---cancel-----+-----cancel----> Cancelled
//! ```
//!
//! Append sessions resume from the existing object's size. The existing
//! content is streamed into the new upload on the first flush, and the stored
//! object is left untouched until commit.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::{debug, trace, warn};

use crate::client::{ObjectStoreClient, PartId, UploadHandle};
use crate::context::Context;
use crate::error::{BackendResult, DriverError, DriverResult};

/// Lifecycle state of a writer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Created, nothing written yet.
    Open,
    /// At least one write accepted.
    Writing,
    /// Content committed; terminal.
    Committed,
    /// Session abandoned; terminal.
    Cancelled,
}

impl WriterState {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }
}

/// A write session on one path.
#[async_trait]
pub trait FileWriter: Send + fmt::Debug {
    /// Append `data`, returning the number of bytes accepted.
    ///
    /// A failed write cancels the session.
    async fn write(&mut self, data: &[u8]) -> DriverResult<usize>;

    /// Bytes in the file so far, including any appended-to prefix.
    fn size(&self) -> u64;

    /// Abandon the session; no change becomes visible. Idempotent.
    async fn cancel(&mut self) -> DriverResult<()>;

    /// Make the written content visible at the path.
    async fn commit(&mut self) -> DriverResult<()>;

    /// Release the session: cancels unless already committed.
    async fn close(&mut self) -> DriverResult<()>;
}

/// [`FileWriter`] backed by an [`ObjectStoreClient`].
pub struct ObjectWriter {
    client: Arc<dyn ObjectStoreClient>,
    ctx: Context,
    path: String,
    key: String,
    chunk_size: usize,
    state: WriterState,
    base_size: u64,
    written: u64,
    buffer: BytesMut,
    /// Append session whose existing content is not yet in the upload.
    pending_base: bool,
    upload: Option<UploadHandle>,
    parts: Vec<PartId>,
}

impl fmt::Debug for ObjectWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectWriter")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("size", &self.size())
            .field("buffered", &self.buffer.len())
            .field("parts", &self.parts.len())
            .finish_non_exhaustive()
    }
}

impl ObjectWriter {
    /// Open a session writing `key` on behalf of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::PathNotFound`] for an append session on a
    /// missing object.
    pub async fn open(
        client: Arc<dyn ObjectStoreClient>,
        ctx: Context,
        path: &str,
        key: String,
        chunk_size: usize,
        append: bool,
    ) -> DriverResult<Self> {
        let base_size = if append {
            let meta = ctx
                .run(async {
                    client
                        .stat_key(&key)
                        .await
                        .map_err(|e| DriverError::from_backend(path, e))
                })
                .await?;
            meta.size
        } else {
            0
        };

        debug!(path, key = %key, append, base_size, "opened writer");
        Ok(Self {
            client,
            ctx,
            path: path.to_owned(),
            key,
            chunk_size: chunk_size.max(1),
            state: WriterState::Open,
            base_size,
            written: 0,
            buffer: BytesMut::new(),
            pending_base: append && base_size > 0,
            upload: None,
            parts: Vec::new(),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Race a backend call against the context, translating `NotFound`.
    async fn call<T>(&self, fut: impl Future<Output = BackendResult<T>>) -> DriverResult<T> {
        let path = self.path.as_str();
        self.ctx
            .run(async { fut.await.map_err(|e| DriverError::from_backend(path, e)) })
            .await
    }

    async fn upload_chunk(&mut self, chunk: Bytes) -> DriverResult<()> {
        let handle = match self.upload.take() {
            Some(handle) => handle,
            None => self.call(self.client.begin_multipart(&self.key)).await?,
        };
        // Out-of-range part numbers are the backend's to reject.
        let part_number = u32::try_from(self.parts.len() + 1).unwrap_or(u32::MAX);
        let result = self
            .call(self.client.upload_part(&handle, part_number, chunk))
            .await;
        self.upload = Some(handle);

        let part = result?;
        trace!(path = %self.path, part_number = part.part_number, "uploaded part");
        self.parts.push(part);
        Ok(())
    }

    /// Move the existing object content of an append session in front of
    /// the buffered bytes, shipping full chunks as they accumulate.
    async fn stage_base(&mut self) -> DriverResult<()> {
        if !self.pending_base {
            return Ok(());
        }
        self.pending_base = false;

        let mut stream = self.call(self.client.get(&self.key, 0)).await?;
        let mut staged = BytesMut::new();
        let mut read = 0u64;
        loop {
            let path = self.path.as_str();
            let next = self
                .ctx
                .run(async {
                    stream
                        .next()
                        .await
                        .transpose()
                        .map_err(|e| DriverError::from_backend(path, e))
                })
                .await?;
            let Some(chunk) = next else { break };
            read += chunk.len() as u64;
            staged.extend_from_slice(&chunk);
            while staged.len() >= self.chunk_size {
                let part = staged.split_to(self.chunk_size).freeze();
                self.upload_chunk(part).await?;
            }
        }

        // The object was replaced since the session was opened.
        if read != self.base_size {
            warn!(
                path = %self.path,
                expected = self.base_size,
                read,
                "existing content changed size"
            );
            return Err(DriverError::InvalidOffset {
                path: self.path.clone(),
                offset: self.base_size,
            });
        }

        trace!(path = %self.path, staged = staged.len(), "staged existing content");
        staged.extend_from_slice(&self.buffer);
        self.buffer = staged;
        Ok(())
    }

    async fn flush_full_chunks(&mut self) -> DriverResult<()> {
        self.stage_base().await?;
        while self.buffer.len() >= self.chunk_size {
            let part = self.buffer.split_to(self.chunk_size).freeze();
            self.upload_chunk(part).await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> DriverResult<()> {
        self.flush_full_chunks().await?;
        let rest = self.buffer.split().freeze();

        match self.upload.clone() {
            None => {
                self.call(self.client.put_small(&self.key, rest)).await?;
            }
            Some(handle) => {
                if !rest.is_empty() {
                    self.upload_chunk(rest).await?;
                }
                self.call(self.client.complete_multipart(&handle, &self.parts))
                    .await?;
                self.upload = None;
            }
        }
        Ok(())
    }

    /// Abort the multipart upload, if any. Runs even when the context is
    /// already cancelled.
    async fn abort_upload(&mut self) -> DriverResult<()> {
        self.buffer.clear();
        self.parts.clear();
        if let Some(handle) = self.upload.take() {
            self.client
                .abort_multipart(&handle)
                .await
                .map_err(DriverError::Backend)?;
            trace!(path = %self.path, upload_id = %handle.upload_id, "aborted upload");
        }
        Ok(())
    }

    async fn fail(&mut self, err: DriverError) -> DriverError {
        if let Err(abort_err) = self.abort_upload().await {
            warn!(path = %self.path, error = %abort_err, "failed to abort upload");
        }
        self.state = WriterState::Cancelled;
        err
    }
}

#[async_trait]
impl FileWriter for ObjectWriter {
    async fn write(&mut self, data: &[u8]) -> DriverResult<usize> {
        if self.state.is_terminal() {
            return Err(DriverError::ClosedWriter);
        }
        self.state = WriterState::Writing;
        self.buffer.extend_from_slice(data);
        self.written += data.len() as u64;

        if self.buffer.len() >= self.chunk_size {
            if let Err(e) = self.flush_full_chunks().await {
                return Err(self.fail(e).await);
            }
        }
        Ok(data.len())
    }

    fn size(&self) -> u64 {
        self.base_size + self.written
    }

    async fn cancel(&mut self) -> DriverResult<()> {
        match self.state {
            WriterState::Cancelled => Ok(()),
            WriterState::Committed => Err(DriverError::ClosedWriter),
            WriterState::Open | WriterState::Writing => {
                self.state = WriterState::Cancelled;
                debug!(path = %self.path, "cancelled writer");
                self.abort_upload().await
            }
        }
    }

    async fn commit(&mut self) -> DriverResult<()> {
        if self.state.is_terminal() {
            return Err(DriverError::ClosedWriter);
        }

        if self.pending_base && self.written == 0 {
            self.pending_base = false;
        } else if let Err(e) = self.finish().await {
            return Err(self.fail(e).await);
        }

        self.state = WriterState::Committed;
        debug!(path = %self.path, size = self.size(), parts = self.parts.len(), "committed writer");
        Ok(())
    }

    async fn close(&mut self) -> DriverResult<()> {
        match self.state {
            WriterState::Committed | WriterState::Cancelled => Ok(()),
            WriterState::Open | WriterState::Writing => self.cancel().await,
        }
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            warn!(
                path = %self.path,
                size = self.size(),
                "writer dropped without commit or cancel"
            );
        }
    }
}
