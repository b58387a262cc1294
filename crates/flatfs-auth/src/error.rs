//! Error types for signer configuration and URL signing.
//!
//! Every failure to set up credentials is reported through [`AuthError`]
//! rather than terminating the process, so the caller decides how to react.

use std::path::PathBuf;

/// Errors that can occur while configuring or using a request signer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No key id was configured.
    #[error("no key id configured (set TRITON_KEY_ID)")]
    MissingKeyId,

    /// Account or key id failed validation.
    #[error(transparent)]
    Core(#[from] flatfs_core::CoreError),

    /// The SSH agent strategy was selected but no agent socket is available.
    #[error("SSH agent unavailable: SSH_AUTH_SOCK is not set")]
    AgentUnavailable,

    /// The key material file exists but could not be read.
    #[error("error reading key material from {}: {source}", path.display())]
    KeyMaterialRead {
        /// Path to the key file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The key material contains no PEM block.
    #[error("failed to read key material {origin}: no key found")]
    NoKeyFound {
        /// Where the material came from (a path or `"inline"`).
        origin: String,
    },

    /// The key is password protected.
    #[error(
        "failed to read key {origin}: password protected keys are not currently supported, decrypt key prior to use"
    )]
    EncryptedKey {
        /// Where the material came from (a path or `"inline"`).
        origin: String,
    },

    /// The strategy cannot produce an in-process signer.
    #[error("strategy {0} does not sign in process")]
    UnsupportedStrategy(&'static str),

    /// A required request header is missing.
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// A header value could not be built from the computed signature.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(String),

    /// The signing secret was rejected by the MAC implementation.
    #[error("invalid signing key")]
    InvalidSigningKey,

    /// The signing algorithm is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required query parameter of a presigned URL is missing or malformed.
    #[error("missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The computed signature does not match the provided signature.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// The presigned URL has expired.
    #[error("request has expired")]
    RequestExpired,
}

/// Convenience result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
