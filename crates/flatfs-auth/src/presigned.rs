//! Presigned URL generation and verification.
//!
//! A presigned URL carries its authentication in query parameters:
//!
//! - `algorithm` - always `hmac-sha256`
//! - `expires` - expiry as Unix seconds
//! - `keyId` - the signing key id
//! - `signature` - base64 HMAC over the string to sign
//!
//! The string to sign is `METHOD\nhost\npath\nquery`, where `query` is the
//! encoded query string up to, but excluding, the `signature` parameter.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use http::{Method, Uri};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::signer::{HMAC_SHA256_ALGORITHM, hmac_sha256};

/// Characters left unescaped in URL paths.
const PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters left unescaped in query values.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Key material used to sign and verify URLs.
#[derive(Clone)]
pub struct UrlSigningKey {
    /// Identifier published in the `keyId` parameter.
    pub key_id: String,
    secret: Vec<u8>,
}

impl UrlSigningKey {
    /// Create a key.
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            key_id: key_id.into(),
            secret,
        }
    }
}

impl fmt::Debug for UrlSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlSigningKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Produce a presigned URL for `path` on `base_url`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidUrl`] if `base_url` has no host.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use flatfs_auth::{UrlSigningKey, presign_url, verify_presigned_url};
///
/// let key = UrlSigningKey::new("/acme/keys/fp", b"secret".to_vec());
/// let expires = Utc::now() + Duration::minutes(20);
/// let url = presign_url("https://objects.example.com", "/acme/stor/a", &http::Method::GET, expires, &key)
///     .unwrap();
/// assert!(url.starts_with("https://objects.example.com/acme/stor/a?algorithm=hmac-sha256"));
/// verify_presigned_url(&url, &http::Method::GET, &key, Utc::now()).unwrap();
/// ```
pub fn presign_url(
    base_url: &str,
    path: &str,
    method: &Method,
    expires_at: DateTime<Utc>,
    key: &UrlSigningKey,
) -> AuthResult<String> {
    let base: Uri = base_url
        .parse()
        .map_err(|_| AuthError::InvalidUrl(base_url.to_owned()))?;
    let host = base
        .authority()
        .ok_or_else(|| AuthError::InvalidUrl(base_url.to_owned()))?
        .as_str();
    let scheme = base.scheme_str().unwrap_or("https");

    let encoded_path = utf8_percent_encode(path, PATH_SET).to_string();
    let query = unsigned_query(expires_at.timestamp(), &key.key_id);
    let signature = sign(method, host, &encoded_path, &query, key)?;

    debug!(method = %method, path, expires = %expires_at, "presigned url");
    Ok(format!(
        "{scheme}://{host}{encoded_path}?{query}&signature={}",
        utf8_percent_encode(&signature, QUERY_SET)
    ))
}

/// Verify a presigned URL against `key` at time `now`.
///
/// # Errors
///
/// - [`AuthError::InvalidUrl`] if the URL cannot be parsed.
/// - [`AuthError::MissingQueryParam`] if a parameter is absent or malformed.
/// - [`AuthError::UnsupportedAlgorithm`] for any algorithm but `hmac-sha256`.
/// - [`AuthError::RequestExpired`] if `now` is past the expiry.
/// - [`AuthError::SignatureDoesNotMatch`] if the signature or key id differ.
pub fn verify_presigned_url(
    url: &str,
    method: &Method,
    key: &UrlSigningKey,
    now: DateTime<Utc>,
) -> AuthResult<()> {
    let uri: Uri = url.parse().map_err(|_| AuthError::InvalidUrl(url.to_owned()))?;
    let host = uri
        .authority()
        .ok_or_else(|| AuthError::InvalidUrl(url.to_owned()))?
        .as_str();
    let query = uri.query().unwrap_or("");

    let params: HashMap<&str, String> = query
        .split('&')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k, percent_decode_str(v).decode_utf8_lossy().into_owned()))
        })
        .collect();

    let algorithm = required(&params, "algorithm")?;
    if algorithm != HMAC_SHA256_ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }
    let expires: i64 = required(&params, "expires")?
        .parse()
        .map_err(|_| AuthError::MissingQueryParam("expires (invalid integer)".to_owned()))?;
    let key_id = required(&params, "keyId")?;
    let provided = required(&params, "signature")?;

    if now.timestamp() > expires {
        return Err(AuthError::RequestExpired);
    }
    if key_id != key.key_id {
        return Err(AuthError::SignatureDoesNotMatch);
    }

    let expected = sign(method, host, uri.path(), &unsigned_query(expires, key_id), key)?;
    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        debug!(path = uri.path(), "presigned url signature mismatch");
        Err(AuthError::SignatureDoesNotMatch)
    }
}

fn unsigned_query(expires: i64, key_id: &str) -> String {
    format!(
        "algorithm={HMAC_SHA256_ALGORITHM}&expires={expires}&keyId={}",
        utf8_percent_encode(key_id, QUERY_SET)
    )
}

fn sign(
    method: &Method,
    host: &str,
    path: &str,
    query: &str,
    key: &UrlSigningKey,
) -> AuthResult<String> {
    let string_to_sign = format!("{method}\n{host}\n{path}\n{query}");
    Ok(BASE64_STANDARD.encode(hmac_sha256(&key.secret, string_to_sign.as_bytes())?))
}

fn required<'a>(params: &'a HashMap<&str, String>, name: &str) -> AuthResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}
