//! Authentication strategy selection and validation.
//!
//! A [`SignerConfig`] names exactly one [`AuthStrategy`] and is validated when
//! it is built: key material is loaded and checked, the agent socket is
//! located. Any problem surfaces as an [`AuthError`] before a storage driver
//! is ever constructed.

use std::path::{Path, PathBuf};

use flatfs_core::{AccountName, KeyId, get_env};
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::pem;
use crate::signer::HmacRequestSigner;

/// Label used in errors for key material supplied inline.
const INLINE_ORIGIN: &str = "inline";

/// How requests are signed.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Delegate signing to the SSH agent listening on `socket`.
    Agent {
        /// Path of the agent's Unix socket.
        socket: PathBuf,
    },
    /// Sign with a private key held in memory.
    KeyMaterial {
        /// Where the key came from: a file path or `"inline"`.
        origin: String,
        /// Decoded PEM block of the private key.
        key: pem::PemBlock,
    },
}

impl AuthStrategy {
    /// Build the agent strategy from `SSH_AUTH_SOCK`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AgentUnavailable`] if no agent socket is set.
    pub fn agent_from_env() -> AuthResult<Self> {
        let socket = std::env::var_os("SSH_AUTH_SOCK")
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::AgentUnavailable)?;
        Ok(Self::Agent {
            socket: PathBuf::from(socket),
        })
    }

    /// Build the key-material strategy.
    ///
    /// `material` is treated as a file path when such a file exists, and as
    /// inline PEM text otherwise.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyMaterialRead`] if the file exists but cannot be read.
    /// - [`AuthError::NoKeyFound`] if no PEM block is present.
    /// - [`AuthError::EncryptedKey`] if the key is password protected.
    pub fn key_material(material: &str) -> AuthResult<Self> {
        let path = Path::new(material);
        let (origin, text) = if path.is_file() {
            let text = std::fs::read_to_string(path).map_err(|source| AuthError::KeyMaterialRead {
                path: path.to_path_buf(),
                source,
            })?;
            (material.to_owned(), text)
        } else {
            (INLINE_ORIGIN.to_owned(), material.to_owned())
        };

        let key = pem::decode(&text).ok_or_else(|| AuthError::NoKeyFound {
            origin: origin.clone(),
        })?;
        if key.is_encrypted() {
            return Err(AuthError::EncryptedKey { origin });
        }

        debug!(origin = %origin, label = %key.label, "loaded private key material");
        Ok(Self::KeyMaterial { origin, key })
    }

    /// Short name of the strategy, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Agent { .. } => "agent",
            Self::KeyMaterial { .. } => "key-material",
        }
    }
}

/// Validated signer configuration handed to the object store client.
#[derive(Debug, Clone)]
pub struct SignerConfig {
    /// Fingerprint of the signing key.
    pub key_id: KeyId,
    /// Account the key belongs to.
    pub account: AccountName,
    /// Optional sub-user the key belongs to.
    pub user: Option<String>,
    /// Selected strategy.
    pub strategy: AuthStrategy,
}

impl SignerConfig {
    /// Assemble a configuration from already-validated parts.
    #[must_use]
    pub fn new(
        key_id: KeyId,
        account: AccountName,
        user: Option<String>,
        strategy: AuthStrategy,
    ) -> Self {
        Self {
            key_id,
            account,
            user,
            strategy,
        }
    }

    /// Select and validate a strategy from the environment.
    ///
    /// Reads `KEY_ID`, `ACCOUNT` (falling back to `USER`), `USER` and
    /// `KEY_MATERIAL` through [`get_env`]. An empty `KEY_MATERIAL` selects the
    /// SSH agent.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure as an [`AuthError`].
    pub fn from_env() -> AuthResult<Self> {
        let key_id = KeyId::new(get_env("KEY_ID").ok_or(AuthError::MissingKeyId)?)?;
        let account_name = get_env("ACCOUNT")
            .or_else(|| get_env("USER"))
            .unwrap_or_default();
        let account = AccountName::new(account_name)?;
        let user = get_env("USER").filter(|u| u != account.as_str());

        let strategy = match get_env("KEY_MATERIAL") {
            Some(material) => AuthStrategy::key_material(&material)?,
            None => AuthStrategy::agent_from_env()?,
        };

        debug!(
            key_id = %key_id,
            account = %account,
            strategy = strategy.kind(),
            "selected signer strategy"
        );
        Ok(Self::new(key_id, account, user, strategy))
    }

    /// In-process signer keyed by the loaded key material, reporting
    /// [`signature_key_id`](Self::signature_key_id).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnsupportedStrategy`] for the agent strategy;
    /// the agent holds the key and signs on its own.
    pub fn request_signer(&self) -> AuthResult<HmacRequestSigner> {
        match &self.strategy {
            AuthStrategy::KeyMaterial { key, .. } => Ok(HmacRequestSigner::new(
                self.signature_key_id(),
                key.contents.clone(),
            )),
            AuthStrategy::Agent { .. } => {
                Err(AuthError::UnsupportedStrategy(self.strategy.kind()))
            }
        }
    }

    /// The `keyId` value used in signatures: `/<account>[/<user>]/keys/<fingerprint>`.
    #[must_use]
    pub fn signature_key_id(&self) -> String {
        match &self.user {
            Some(user) => format!("/{}/{user}/keys/{}", self.account, self.key_id),
            None => format!("/{}/keys/{}", self.account, self.key_id),
        }
    }
}
