//! Request signing.
//!
//! A [`RequestSigner`] adds an `authorization` header to outgoing requests in
//! the HTTP signature scheme the object store expects:
//!
//! ```text
//! Signature keyId="/acct/keys/<fp>",algorithm="hmac-sha256",headers="date",signature="<b64>"
//! ```
//!
//! Only the `date` header is signed.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::HeaderValue;
use http::request::Parts;
use sha2::Sha256;
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Algorithm name carried in signatures produced by [`HmacRequestSigner`].
pub const HMAC_SHA256_ALGORITHM: &str = "hmac-sha256";

const DATE_HEADER: &str = "date";

type HmacSha256 = Hmac<Sha256>;

/// Capability to sign an outgoing request.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Sign the request head, returning it with an `authorization` header set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingHeader`] if the `date` header is absent.
    fn sign(&self, parts: Parts) -> AuthResult<Parts>;

    /// The `keyId` this signer reports.
    fn key_id(&self) -> &str;
}

/// Signs requests with a shared secret using HMAC-SHA256.
#[derive(Clone)]
pub struct HmacRequestSigner {
    key_id: String,
    secret: Vec<u8>,
}

impl HmacRequestSigner {
    /// Create a signer for `key_id` with the given secret.
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            secret,
        }
    }

    fn authorization(&self, date: &str) -> AuthResult<String> {
        let signing_string = format!("{DATE_HEADER}: {date}");
        let digest = hmac_sha256(&self.secret, signing_string.as_bytes())?;
        let signature = BASE64_STANDARD.encode(digest);
        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"{HMAC_SHA256_ALGORITHM}\",headers=\"{DATE_HEADER}\",signature=\"{signature}\"",
            self.key_id
        ))
    }
}

impl fmt::Debug for HmacRequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacRequestSigner")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl RequestSigner for HmacRequestSigner {
    fn sign(&self, mut parts: Parts) -> AuthResult<Parts> {
        let date = parts
            .headers
            .get(DATE_HEADER)
            .ok_or_else(|| AuthError::MissingHeader(DATE_HEADER.to_owned()))?
            .to_str()
            .map_err(|_| AuthError::MissingHeader(DATE_HEADER.to_owned()))?
            .to_owned();

        let value = self.authorization(&date)?;
        let header = HeaderValue::from_str(&value)
            .map_err(|e| AuthError::InvalidHeaderValue(e.to_string()))?;
        parts.headers.insert(http::header::AUTHORIZATION, header);

        debug!(key_id = %self.key_id, uri = %parts.uri, "signed request");
        Ok(parts)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}

/// Format `at` as an HTTP `date` header value (RFC 7231 IMF-fixdate).
#[must_use]
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Compute HMAC-SHA256 and return the raw bytes.
pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidSigningKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
