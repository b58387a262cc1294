//! Pre-signed URL options and translation.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use http::Method;
use serde_json::Value;
use tracing::debug;

use crate::client::ObjectStoreClient;
use crate::context::Context;
use crate::error::{BackendError, DriverError, DriverResult};

/// Validity of a URL when none is requested.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(20 * 60);

/// Options for [`StorageDriver::url_for`](crate::driver::StorageDriver::url_for).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    /// HTTP method the URL grants; `GET` or `HEAD`.
    pub method: Method,
    /// How long the URL stays valid.
    pub expires_in: Duration,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            expires_in: DEFAULT_URL_EXPIRY,
        }
    }
}

impl UrlOptions {
    /// Read options from the registry's parameter map.
    ///
    /// `method` is a method name and `expiry` an RFC 3339 timestamp. Values
    /// that are missing or of the wrong type fall back to the defaults; an
    /// expiry in the past yields a zero validity.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::UnsupportedMethod`] naming the given value when
    /// `method` is not a valid method name.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use flatfs_driver::urls::{DEFAULT_URL_EXPIRY, UrlOptions};
    ///
    /// let mut params = HashMap::new();
    /// params.insert("method".to_owned(), serde_json::json!("HEAD"));
    /// let options = UrlOptions::from_parameters(&params).unwrap();
    /// assert_eq!(options.method, http::Method::HEAD);
    /// assert_eq!(options.expires_in, DEFAULT_URL_EXPIRY);
    /// ```
    pub fn from_parameters<S: std::hash::BuildHasher>(
        params: &HashMap<String, Value, S>,
    ) -> DriverResult<Self> {
        Self::from_parameters_at(params, Utc::now())
    }

    fn from_parameters_at<S: std::hash::BuildHasher>(
        params: &HashMap<String, Value, S>,
        now: DateTime<Utc>,
    ) -> DriverResult<Self> {
        let mut options = Self::default();
        if let Some(method) = params.get("method").and_then(Value::as_str) {
            options.method =
                Method::from_bytes(method.as_bytes()).map_err(|_| DriverError::UnsupportedMethod {
                    method: method.to_owned(),
                })?;
        }
        if let Some(expiry) = params
            .get("expiry")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            options.expires_in = (expiry.with_timezone(&Utc) - now)
                .to_std()
                .unwrap_or(Duration::ZERO);
        }
        Ok(options)
    }
}

/// Sign a URL for `key` through the client.
pub(crate) async fn url_for(
    client: &dyn ObjectStoreClient,
    ctx: &Context,
    key: &str,
    options: &UrlOptions,
) -> DriverResult<String> {
    let unsupported = || DriverError::UnsupportedMethod {
        method: options.method.to_string(),
    };
    if options.method != Method::GET && options.method != Method::HEAD {
        return Err(unsupported());
    }

    let url = ctx
        .run(async {
            client
                .sign_url(key, &options.method, options.expires_in)
                .await
                .map_err(|e| match e {
                    BackendError::Unsupported => unsupported(),
                    other => DriverError::Backend(other),
                })
        })
        .await?;
    debug!(key, method = %options.method, expires_in = ?options.expires_in, "signed url");
    Ok(url)
}
