//! Error types for the storage driver and the object store facade.
//!
//! Two layers of errors exist:
//!
//! - [`BackendError`] is what an [`ObjectStoreClient`](crate::client::ObjectStoreClient)
//!   reports, in the key-value vocabulary of the flat store.
//! - [`DriverError`] is what driver callers see, in the hierarchical path
//!   vocabulary. Backend errors that have no path-level meaning are carried
//!   through unchanged in [`DriverError::Backend`].
//!
//! # Usage
//!
//! ```
//! use flatfs_driver::error::{BackendError, DriverError};
//!
//! let err: DriverError = BackendError::Unsupported.into();
//! assert!(matches!(err, DriverError::Backend(BackendError::Unsupported)));
//!
//! let err = DriverError::PathNotFound { path: "/a/b".to_owned() };
//! assert_eq!(err.to_string(), "path not found: /a/b");
//! ```

use std::fmt;

/// Errors reported by an object store facade.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The key does not exist.
    #[error("no such key: {key}")]
    NotFound {
        /// The key that was not found.
        key: String,
    },

    /// The backend does not support the requested capability.
    #[error("operation not supported by this backend")]
    Unsupported,

    /// The multipart upload does not exist (already completed or aborted).
    #[error("no such upload: {upload_id}")]
    NoSuchUpload {
        /// The upload id that was not found.
        upload_id: String,
    },

    /// A part named at completion was never uploaded or does not match.
    #[error("invalid part: {part_number}")]
    InvalidPart {
        /// The offending part number.
        part_number: u32,
    },

    /// Transport or server failure.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors reported by storage driver operations.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// No object or directory exists at the path.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: String,
    },

    /// The path is malformed.
    #[error("invalid path: {path:?}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// The read offset lies beyond the end of the object.
    #[error("invalid offset {offset} for path {path}")]
    InvalidOffset {
        /// The path being read.
        path: String,
        /// The requested offset.
        offset: u64,
    },

    /// The writer was already committed or cancelled.
    #[error("writer is closed")]
    ClosedWriter,

    /// The URL method is not supported, or the backend cannot sign URLs.
    #[error("unsupported url method: {method}")]
    UnsupportedMethod {
        /// The requested method.
        method: String,
    },

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Failure reported by the object store.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Several independent failures, e.g. from a subtree delete.
    #[error("{}", AggregateDisplay(.0))]
    Aggregate(Vec<DriverError>),
}

impl DriverError {
    /// Convert a backend error for `path`, mapping `NotFound` to `PathNotFound`.
    #[must_use]
    pub fn from_backend(path: &str, err: BackendError) -> Self {
        match err {
            BackendError::NotFound { .. } => Self::PathNotFound {
                path: path.to_owned(),
            },
            other => Self::Backend(other),
        }
    }
}

struct AggregateDisplay<'a>(&'a [DriverError]);

impl fmt::Display for AggregateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors occurred:", self.0.len())?;
        for err in self.0 {
            write!(f, "\n  * {err}")?;
        }
        Ok(())
    }
}

/// Convenience result type for facade operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Convenience result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
