//! Uniform path validation and tracing around any [`StorageDriver`].
//!
//! [`Base`] checks every path before the wrapped driver sees it and records
//! each call's duration and outcome, so driver implementations only handle
//! well-formed input.
//!
//! ```
//! use std::sync::Arc;
//!
//! use flatfs_driver::base::Base;
//! use flatfs_driver::config::DriverConfig;
//! use flatfs_driver::context::Context;
//! use flatfs_driver::driver::{FlatDriver, StorageDriver};
//! use flatfs_driver::error::DriverError;
//! use flatfs_driver::memory::InMemoryObjectStore;
//!
//! # tokio_test::block_on(async {
//! let config = DriverConfig::builder().root_directory("/r".to_owned()).build();
//! let driver = Base::new(FlatDriver::new(Arc::new(InMemoryObjectStore::default()), &config));
//!
//! let err = driver.get_content(&Context::background(), "/a/../b").await.unwrap_err();
//! assert!(matches!(err, DriverError::InvalidPath { .. }));
//! # });
//! ```

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::context::Context;
use crate::driver::{ReadStream, StorageDriver};
use crate::error::DriverResult;
use crate::path::validate_path;
use crate::urls::UrlOptions;
use crate::walk::{FileInfo, WalkFn};
use crate::writer::FileWriter;

/// Validating, tracing wrapper around a [`StorageDriver`].
#[derive(Debug, Clone)]
pub struct Base<D> {
    inner: D,
}

impl<D: StorageDriver> Base<D> {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    /// The wrapped driver.
    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }

    async fn traced<T, F>(&self, op: &'static str, path: &str, fut: F) -> DriverResult<T>
    where
        F: Future<Output = DriverResult<T>>,
    {
        let started = Instant::now();
        trace!(driver = self.inner.name(), op, path, "driver call");
        let result = fut.await;
        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(_) => trace!(
                driver = self.inner.name(),
                op,
                path,
                elapsed_ms,
                "driver call finished"
            ),
            Err(e) => debug!(
                driver = self.inner.name(),
                op,
                path,
                elapsed_ms,
                error = %e,
                "driver call failed"
            ),
        }
        result
    }
}

#[async_trait]
impl<D: StorageDriver> StorageDriver for Base<D> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn reader(&self, ctx: &Context, path: &str, offset: u64) -> DriverResult<ReadStream> {
        let path = validate_path(path, false)?;
        self.traced("reader", path, self.inner.reader(ctx, path, offset))
            .await
    }

    async fn writer(
        &self,
        ctx: &Context,
        path: &str,
        append: bool,
    ) -> DriverResult<Box<dyn FileWriter>> {
        let path = validate_path(path, false)?;
        self.traced("writer", path, self.inner.writer(ctx, path, append))
            .await
    }

    async fn stat(&self, ctx: &Context, path: &str) -> DriverResult<FileInfo> {
        let path = validate_path(path, true)?;
        self.traced("stat", path, self.inner.stat(ctx, path)).await
    }

    async fn list(&self, ctx: &Context, path: &str) -> DriverResult<Vec<String>> {
        let path = validate_path(path, true)?;
        self.traced("list", path, self.inner.list(ctx, path)).await
    }

    async fn walk(&self, ctx: &Context, path: &str, visit: &mut WalkFn<'_>) -> DriverResult<()> {
        let path = validate_path(path, true)?;
        self.traced("walk", path, self.inner.walk(ctx, path, visit))
            .await
    }

    async fn move_object(&self, ctx: &Context, src: &str, dst: &str) -> DriverResult<()> {
        let src = validate_path(src, false)?;
        let dst = validate_path(dst, false)?;
        self.traced("move", src, self.inner.move_object(ctx, src, dst))
            .await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> DriverResult<()> {
        let path = validate_path(path, false)?;
        self.traced("delete", path, self.inner.delete(ctx, path)).await
    }

    async fn get_content(&self, ctx: &Context, path: &str) -> DriverResult<Bytes> {
        let path = validate_path(path, false)?;
        self.traced("get_content", path, self.inner.get_content(ctx, path))
            .await
    }

    async fn put_content(&self, ctx: &Context, path: &str, data: Bytes) -> DriverResult<()> {
        let path = validate_path(path, false)?;
        self.traced("put_content", path, self.inner.put_content(ctx, path, data))
            .await
    }

    async fn url_for(
        &self,
        ctx: &Context,
        path: &str,
        options: &UrlOptions,
    ) -> DriverResult<String> {
        let path = validate_path(path, false)?;
        self.traced("url_for", path, self.inner.url_for(ctx, path, options))
            .await
    }
}
