//! Connection configuration for the remote object store.
//!
//! Values are driven by environment variables resolved through
//! [`get_env`](crate::get_env), so `TRITON_URL` and `SDC_URL` are both honored.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::env::get_env;
use crate::error::{CoreError, CoreResult};
use crate::types::AccountName;

/// Default endpoint of the remote object store.
const DEFAULT_URL: &str = "https://us-central.manta.mnx.io";

/// Connection settings for the object store client.
///
/// # Examples
///
/// ```
/// use flatfs_core::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .account("registry".to_owned())
///     .build();
/// assert_eq!(config.url, "https://us-central.manta.mnx.io");
/// assert!(config.user.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the object store endpoint.
    #[builder(default = String::from(DEFAULT_URL))]
    pub url: String,

    /// Account that owns the stored objects.
    pub account: String,

    /// Optional sub-user acting on behalf of the account.
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Logical name | Required | Default |
    /// |--------------|----------|---------|
    /// | `URL` | no | `https://us-central.manta.mnx.io` |
    /// | `ACCOUNT` | yes (falls back to `USER`) | |
    /// | `USER` | no | |
    ///
    /// `LOG_LEVEL` is read unprefixed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when no account is configured.
    pub fn from_env() -> CoreResult<Self> {
        let account = get_env("ACCOUNT")
            .or_else(|| get_env("USER"))
            .ok_or_else(|| {
                CoreError::Config("no account configured (set TRITON_ACCOUNT)".to_owned())
            })?;
        let user = get_env("USER").filter(|u| *u != account);
        let mut config = Self::builder().account(account).user(user).build();
        if let Some(url) = get_env("URL") {
            config.url = url;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check the account name and URL scheme.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAccountName`] or [`CoreError::Config`].
    pub fn validate(&self) -> CoreResult<()> {
        AccountName::new(self.account.as_str())?;
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(CoreError::Config(format!(
                "object store url must be http(s): {}",
                self.url
            )));
        }
        Ok(())
    }

    /// Path under which the account's stored objects live (`/<account>/stor`).
    #[must_use]
    pub fn storage_root(&self) -> String {
        format!("/{}/stor", self.account)
    }
}
