//! The storage driver interface and its object store implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use flatfs_core::CoreResult;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ByteStream, ObjectStoreClient};
use crate::config::DriverConfig;
use crate::content;
use crate::context::Context;
use crate::error::{BackendError, DriverError, DriverResult};
use crate::path::{KeyMapper, ROOT, validate_path};
use crate::urls::{self, UrlOptions};
use crate::walk::{FileInfo, WalkFn, Walker};
use crate::writer::{FileWriter, ObjectWriter};

/// Name reported by [`FlatDriver`].
pub const DRIVER_NAME: &str = "manta";

/// A stream of file content as seen by driver callers.
pub type ReadStream = BoxStream<'static, DriverResult<Bytes>>;

/// Hierarchical storage operations.
///
/// Every path argument is absolute. Only [`stat`](Self::stat),
/// [`list`](Self::list) and [`walk`](Self::walk) accept the root `/`.
#[async_trait]
pub trait StorageDriver: Send + Sync + fmt::Debug {
    /// Short name identifying the driver.
    fn name(&self) -> &'static str;

    /// Stream the content at `path` from `offset`.
    ///
    /// An offset equal to the size yields an empty stream; a larger one is
    /// [`DriverError::InvalidOffset`].
    async fn reader(&self, ctx: &Context, path: &str, offset: u64) -> DriverResult<ReadStream>;

    /// Open a write session. `append` resumes an existing object.
    async fn writer(
        &self,
        ctx: &Context,
        path: &str,
        append: bool,
    ) -> DriverResult<Box<dyn FileWriter>>;

    /// Describe the file or directory at `path`.
    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo>;

    /// Paths of the direct children of `path`, sorted.
    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>>;

    /// Visit every file and directory below `path`, depth-first in path order.
    async fn walk(&self, ctx: &Context, path: &str, visit: &mut WalkFn<'_>) -> DriverResult<()>;

    /// Move the object at `src` to `dst`, replacing any object there.
    async fn move_object(&self, ctx: &Context, src: &str, dst: &str) -> DriverResult<()>;

    /// Delete the object at `path` and everything below it.
    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()>;

    /// Read the entire object at `path`.
    async fn get_content(&self, ctx: &Context, path: &str) -> DriverResult<Bytes> {
        content::get_content(self, ctx, path).await
    }

    /// Replace the object at `path` with `data`.
    async fn put_content(&self, ctx: &Context, path: &str, data: Bytes) -> DriverResult<()> {
        content::put_content(self, ctx, path, data).await
    }

    /// A URL through which the object at `path` can be fetched directly.
    async fn url_for(
        &self,
        ctx: &Context,
        path: &str,
        options: &UrlOptions,
    ) -> DriverResult<String>;
}

/// [`StorageDriver`] over an [`ObjectStoreClient`].
#[derive(Debug, Clone)]
pub struct FlatDriver {
    client: Arc<dyn ObjectStoreClient>,
    mapper: KeyMapper,
    chunk_size: usize,
}

impl FlatDriver {
    /// Create a driver storing everything under `config.root_directory`.
    #[must_use]
    pub fn new(client: Arc<dyn ObjectStoreClient>, config: &DriverConfig) -> Self {
        debug!(
            root = %config.root_directory,
            chunk_size = config.chunk_size,
            "creating storage driver"
        );
        Self {
            client,
            mapper: KeyMapper::new(&config.root_directory),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Create a driver from registry parameters; see
    /// [`DriverConfig::from_parameters`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for missing or malformed parameters.
    pub fn from_parameters<S: std::hash::BuildHasher>(
        client: Arc<dyn ObjectStoreClient>,
        params: &HashMap<String, Value, S>,
    ) -> CoreResult<Self> {
        let config = DriverConfig::from_parameters(params)?;
        Ok(Self::new(client, &config))
    }

    /// The path-to-key mapping in use.
    #[must_use]
    pub fn mapper(&self) -> &KeyMapper {
        &self.mapper
    }

    fn walker<'a>(&'a self, ctx: &'a Context) -> Walker<'a> {
        Walker {
            client: self.client.as_ref(),
            mapper: &self.mapper,
            ctx,
        }
    }

    /// Stream `src_key` into a fresh object at `dst_key`.
    async fn copy(
        &self,
        ctx: &Context,
        src: &str,
        src_key: &str,
        dst: &str,
        dst_key: &str,
    ) -> DriverResult<()> {
        let mut source = ctx
            .run(async {
                self.client
                    .get(src_key, 0)
                    .await
                    .map_err(|e| DriverError::from_backend(src, e))
            })
            .await?;

        let mut writer = ObjectWriter::open(
            self.client.clone(),
            ctx.clone(),
            dst,
            dst_key.to_owned(),
            self.chunk_size,
            false,
        )
        .await?;

        let result = async {
            while let Some(chunk) = ctx
                .run(async {
                    source
                        .next()
                        .await
                        .transpose()
                        .map_err(|e| DriverError::from_backend(src, e))
                })
                .await?
            {
                writer.write(&chunk).await?;
            }
            writer.commit().await
        }
        .await;

        if result.is_err() {
            if let Err(e) = writer.close().await {
                warn!(dst, error = %e, "failed to close writer after failed copy");
            }
        }
        result
    }
}

/// Wrap a backend stream so it maps errors and stops on cancellation.
fn guard_stream(inner: ByteStream, ctx: Context, path: String) -> ReadStream {
    futures::stream::unfold(Some(inner), move |state| {
        let ctx = ctx.clone();
        let path = path.clone();
        async move {
            let mut inner = state?;
            let next = tokio::select! {
                biased;
                () = ctx.cancelled() => None,
                next = inner.next() => Some(next),
            };
            match next {
                None => Some((Err(DriverError::Cancelled), None)),
                Some(None) => None,
                Some(Some(Ok(chunk))) => Some((Ok(chunk), Some(inner))),
                Some(Some(Err(e))) => Some((Err(DriverError::from_backend(&path, e)), None)),
            }
        }
    })
    .boxed()
}

#[async_trait]
impl StorageDriver for FlatDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    async fn reader(&self, ctx: &Context, path: &str, offset: u64) -> DriverResult<ReadStream> {
        let key = self.mapper.to_key(path)?;
        let meta = ctx
            .run(async {
                self.client
                    .stat_key(&key)
                    .await
                    .map_err(|e| DriverError::from_backend(path, e))
            })
            .await?;

        if offset > meta.size {
            return Err(DriverError::InvalidOffset {
                path: path.to_owned(),
                offset,
            });
        }
        if offset == meta.size {
            return Ok(futures::stream::empty().boxed());
        }

        let inner = ctx
            .run(async {
                self.client
                    .get(&key, offset)
                    .await
                    .map_err(|e| DriverError::from_backend(path, e))
            })
            .await?;
        Ok(guard_stream(inner, ctx.clone(), path.to_owned()))
    }

    async fn writer(
        &self,
        ctx: &Context,
        path: &str,
        append: bool,
    ) -> DriverResult<Box<dyn FileWriter>> {
        let key = self.mapper.to_key(path)?;
        let writer = ObjectWriter::open(
            self.client.clone(),
            ctx.clone(),
            path,
            key,
            self.chunk_size,
            append,
        )
        .await?;
        Ok(Box::new(writer))
    }

    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo> {
        let path = validate_path(path, true)?;
        let directory_mod_time = self.walker(ctx).directory_mod_time(path).await?;

        if path == ROOT || directory_mod_time.is_some() {
            return Ok(FileInfo {
                path: path.to_owned(),
                size: 0,
                mod_time: directory_mod_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                is_dir: true,
            });
        }

        let key = self.mapper.to_key(path)?;
        let meta = ctx
            .run(async {
                self.client
                    .stat_key(&key)
                    .await
                    .map_err(|e| DriverError::from_backend(path, e))
            })
            .await?;
        Ok(FileInfo {
            path: path.to_owned(),
            size: meta.size,
            mod_time: meta.last_modified,
            is_dir: false,
        })
    }

    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>> {
        self.walker(ctx).list(path).await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: &mut WalkFn<'_>) -> DriverResult<()> {
        self.walker(ctx).walk(path, visit).await
    }

    async fn move_object(&self, ctx: &Context, src: &str, dst: &str) -> DriverResult<()> {
        let src_key = self.mapper.to_key(src)?;
        let dst_key = self.mapper.to_key(dst)?;
        let meta = ctx
            .run(async {
                self.client
                    .stat_key(&src_key)
                    .await
                    .map_err(|e| DriverError::from_backend(src, e))
            })
            .await?;
        if src_key == dst_key {
            return Ok(());
        }

        self.copy(ctx, src, &src_key, dst, &dst_key).await?;
        match ctx.run(self.client.delete(&src_key)).await {
            Ok(()) | Err(DriverError::Backend(BackendError::NotFound { .. })) => {}
            Err(e) => return Err(e),
        }

        debug!(src, dst, size = meta.size, "moved object");
        Ok(())
    }

    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()> {
        let key = self.mapper.to_key(path)?;
        let prefix = self.mapper.dir_prefix(path)?;
        let mut found = 0usize;
        let mut errors = Vec::new();

        match ctx.run(self.client.delete(&key)).await {
            Ok(()) => found += 1,
            Err(DriverError::Backend(BackendError::NotFound { .. })) => {}
            Err(DriverError::Cancelled) => return Err(DriverError::Cancelled),
            Err(e) => {
                found += 1;
                errors.push(e);
            }
        }

        let mut cursor = None;
        loop {
            let page = match ctx
                .run(self.client.list_by_prefix(&prefix, cursor.as_ref()))
                .await
            {
                Ok(page) => page,
                Err(DriverError::Cancelled) => return Err(DriverError::Cancelled),
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "failed to list keys for delete");
                    errors.push(e);
                    break;
                }
            };
            for meta in &page.entries {
                found += 1;
                match ctx.run(self.client.delete(&meta.key)).await {
                    Ok(()) | Err(DriverError::Backend(BackendError::NotFound { .. })) => {}
                    Err(DriverError::Cancelled) => return Err(DriverError::Cancelled),
                    Err(e) => {
                        warn!(key = %meta.key, error = %e, "failed to delete key");
                        errors.push(e);
                    }
                }
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if found == 0 && errors.is_empty() {
            return Err(DriverError::PathNotFound {
                path: path.to_owned(),
            });
        }
        debug!(
            path,
            deleted = found.saturating_sub(errors.len()),
            failed = errors.len(),
            "deleted path"
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DriverError::Aggregate(errors))
        }
    }

    async fn url_for(
        &self,
        ctx: &Context,
        path: &str,
        options: &UrlOptions,
    ) -> DriverResult<String> {
        let key = self.mapper.to_key(path)?;
        urls::url_for(self.client.as_ref(), ctx, &key, options).await
    }
}
