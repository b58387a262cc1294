//! Core types, configuration, and logging setup for flatfs.
//!
//! This crate provides the foundational building blocks shared by the signer
//! configuration layer and the storage driver: account and key identifiers,
//! environment-driven connection configuration, and tracing initialization.

mod config;
mod env;
mod error;
mod logging;
mod types;

pub use config::ClientConfig;
pub use env::{ENV_PREFIXES, get_env};
pub use error::{CoreError, CoreResult};
pub use logging::init_tracing;
pub use types::{AccountName, KeyId};
