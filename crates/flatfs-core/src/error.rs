//! Error types for the flatfs core.

/// Core error type for flatfs infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Invalid account name.
    #[error("invalid account name: {0:?} (must be non-empty and contain no '/')")]
    InvalidAccountName(String),

    /// Invalid key identifier.
    #[error("invalid key id: {0:?} (expected an MD5 or SHA256 key fingerprint)")]
    InvalidKeyId(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result type for flatfs core operations.
pub type CoreResult<T> = Result<T, CoreError>;
