//! Driver assembly from connection, signer, and driver configuration.
//!
//! [`DriverSetup`] gathers everything needed before a client can be built:
//! the endpoint, validated signing credentials, and the driver settings.
//! Every check runs while the setup is assembled, so a bad key or a
//! mismatched account is reported before any client or driver exists.

use std::collections::HashMap;
use std::sync::Arc;

use flatfs_auth::{AuthError, SignerConfig};
use flatfs_core::{ClientConfig, CoreError, init_tracing};
use serde_json::Value;
use tracing::{debug, info};

use crate::base::Base;
use crate::client::ObjectStoreClient;
use crate::config::DriverConfig;
use crate::driver::FlatDriver;

/// Errors raised while assembling a driver.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Connection or driver configuration is invalid.
    #[error(transparent)]
    Config(#[from] CoreError),

    /// Signer configuration is invalid.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Validated inputs for building a storage driver.
#[derive(Debug, Clone)]
pub struct DriverSetup {
    /// Object store endpoint and account.
    pub client: ClientConfig,
    /// Credentials requests are signed with.
    pub signer: SignerConfig,
    /// Root directory and chunk size.
    pub driver: DriverConfig,
}

impl DriverSetup {
    /// Combine already-loaded configurations.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] when the client configuration is
    /// invalid or the signer belongs to a different account.
    pub fn new(
        client: ClientConfig,
        signer: SignerConfig,
        driver: DriverConfig,
    ) -> Result<Self, SetupError> {
        client.validate()?;
        if signer.account.as_str() != client.account {
            return Err(CoreError::Config(format!(
                "signer account {} does not match client account {}",
                signer.account, client.account
            ))
            .into());
        }
        Ok(Self {
            client,
            signer,
            driver,
        })
    }

    /// Combine client and signer configuration with registry parameters.
    ///
    /// Without `rootdirectory` or `path` the driver stores under the
    /// account's storage root (`/<account>/stor`).
    ///
    /// # Errors
    ///
    /// See [`DriverSetup::new`] and [`DriverConfig::from_parameters`].
    pub fn from_parameters<S: std::hash::BuildHasher>(
        client: ClientConfig,
        signer: SignerConfig,
        params: &HashMap<String, Value, S>,
    ) -> Result<Self, SetupError> {
        let driver = if params.contains_key("rootdirectory") || params.contains_key("path") {
            DriverConfig::from_parameters(params)?
        } else {
            let mut with_root: HashMap<String, Value> = params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            with_root.insert(
                "rootdirectory".to_owned(),
                Value::String(client.storage_root()),
            );
            DriverConfig::from_parameters(&with_root)?
        };
        Self::new(client, signer, driver)
    }

    /// Load client and signer configuration from the environment, install
    /// the tracing subscriber at the configured level, and apply `params`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration or credential failure.
    pub fn from_env<S: std::hash::BuildHasher>(
        params: &HashMap<String, Value, S>,
    ) -> Result<Self, SetupError> {
        let client = ClientConfig::from_env()?;
        init_tracing(&client.log_level)?;
        let signer = SignerConfig::from_env()?;
        Self::from_parameters(client, signer, params)
    }

    /// Build the client with `connect` and wrap it in a driver.
    #[must_use]
    pub fn build<F>(&self, connect: F) -> Base<FlatDriver>
    where
        F: FnOnce(&ClientConfig, &SignerConfig) -> Arc<dyn ObjectStoreClient>,
    {
        debug!(
            url = %self.client.url,
            strategy = self.signer.strategy.kind(),
            "connecting object store client"
        );
        let client = connect(&self.client, &self.signer);
        info!(
            account = %self.client.account,
            root = %self.driver.root_directory,
            "storage driver ready"
        );
        crate::new_driver(client, &self.driver)
    }
}
