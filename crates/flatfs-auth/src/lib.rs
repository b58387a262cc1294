//! Signer configuration, request signing, and presigned URLs for flatfs.
//!
//! The storage driver never talks to a credential store itself: it receives an
//! already-authenticated client. This crate is the layer that runs *before*
//! the driver is constructed. It selects and validates the authentication
//! strategy, and provides the signing primitives an object store client needs.
//!
//! # Strategies
//!
//! - [`AuthStrategy::Agent`] delegates signing to a running SSH agent.
//! - [`AuthStrategy::KeyMaterial`] signs with a private key loaded from a PEM
//!   file or inline PEM text. Password-protected keys are rejected.
//!
//! # Usage
//!
//! ```rust
//! use flatfs_auth::{HmacRequestSigner, RequestSigner};
//!
//! let signer = HmacRequestSigner::new("/registry/keys/ci", b"secret".to_vec());
//! let request = http::Request::get("https://objects.example.com/registry/stor/a")
//!     .header("date", "Fri, 05 Jan 2024 21:31:40 GMT")
//!     .body(())
//!     .unwrap();
//! let (parts, ()) = request.into_parts();
//! let signed = signer.sign(parts).unwrap();
//! assert!(signed.headers.contains_key("authorization"));
//! ```
//!
//! # Modules
//!
//! - [`credentials`] - Strategy selection and validation
//! - [`error`] - Authentication error types
//! - [`pem`] - Minimal PEM block decoding
//! - [`presigned`] - Presigned URL generation and verification
//! - [`signer`] - Request signer capability and HMAC implementation

pub mod credentials;
pub mod error;
pub mod pem;
pub mod presigned;
pub mod signer;

pub use credentials::{AuthStrategy, SignerConfig};
pub use error::AuthError;
pub use presigned::{UrlSigningKey, presign_url, verify_presigned_url};
pub use signer::{HmacRequestSigner, RequestSigner, http_date};
