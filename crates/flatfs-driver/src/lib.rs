//! Hierarchical storage driver emulated over a flat object store.
//!
//! A registry stores blobs and manifests under `/`-separated paths. The
//! object store underneath only knows opaque keys. This crate bridges the
//! two: it maps paths to keys, infers directories from key prefixes, and
//! offers a resumable streaming writer whose content becomes visible
//! atomically on commit.
//!
//! # Architecture
//!
//! ```text
//! caller (registry)
//!        |
//!        v
//!   DriverSetup (client, signer, driver config)
//!        |
//!        v
//!   Base<D> (path validation, tracing)
//!        |
//!        v
//!   FlatDriver (StorageDriver impl)
//!    |      |       |
//!    v      v       v
//! KeyMapper Walker ObjectWriter
//!        \    |    /
//!         v   v   v
//!   ObjectStoreClient (flat keys, multipart, prefix listing)
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use flatfs_driver::{Context, DriverConfig, StorageDriver, memory::InMemoryObjectStore};
//!
//! # tokio_test::block_on(async {
//! let config = DriverConfig::builder().root_directory("/registry/stor".to_owned()).build();
//! let driver = flatfs_driver::new_driver(Arc::new(InMemoryObjectStore::default()), &config);
//! let ctx = Context::background();
//!
//! driver.put_content(&ctx, "/docker/a", Bytes::from("blob")).await.unwrap();
//! assert_eq!(driver.get_content(&ctx, "/docker/a").await.unwrap(), "blob");
//! assert_eq!(driver.list(&ctx, "/docker").await.unwrap(), ["/docker/a"]);
//! # });
//! ```

pub mod base;
pub mod client;
pub mod config;
pub mod content;
pub mod context;
pub mod driver;
pub mod error;
pub mod memory;
pub mod path;
pub mod setup;
pub mod urls;
pub mod walk;
pub mod writer;

use std::collections::HashMap;
use std::sync::Arc;

use flatfs_core::CoreResult;
use serde_json::Value;

pub use base::Base;
pub use client::ObjectStoreClient;
pub use config::DriverConfig;
pub use context::{CancellationSource, Context};
pub use driver::{FlatDriver, StorageDriver};
pub use error::{BackendError, DriverError, DriverResult};
pub use setup::{DriverSetup, SetupError};
pub use urls::UrlOptions;
pub use walk::{FileInfo, WalkControl};
pub use writer::FileWriter;

/// Build the wrapped driver for `config`.
#[must_use]
pub fn new_driver(client: Arc<dyn ObjectStoreClient>, config: &DriverConfig) -> Base<FlatDriver> {
    Base::new(FlatDriver::new(client, config))
}

/// Build the wrapped driver from registry parameters.
///
/// # Errors
///
/// Returns a configuration error when `rootdirectory`/`path` is missing or
/// a value is malformed.
pub fn from_parameters<S: std::hash::BuildHasher>(
    client: Arc<dyn ObjectStoreClient>,
    params: &HashMap<String, Value, S>,
) -> CoreResult<Base<FlatDriver>> {
    Ok(Base::new(FlatDriver::from_parameters(client, params)?))
}
