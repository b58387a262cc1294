//! Identifier types shared across the signer and driver crates.

use std::fmt;

/// Length of an MD5 key fingerprint in `aa:bb:...` form (16 hex pairs, 15 colons).
const MD5_FINGERPRINT_LEN: usize = 47;

/// Prefix used by SHA256 key fingerprints.
const SHA256_FINGERPRINT_PREFIX: &str = "SHA256:";

/// Object store account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AccountName(String);

impl AccountName {
    /// Create a new account name.
    ///
    /// # Errors
    /// Returns an error if the name is empty or contains a `/`.
    pub fn new(name: impl Into<String>) -> Result<Self, crate::CoreError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(crate::CoreError::InvalidAccountName(name));
        }
        Ok(Self(name))
    }

    /// Get the account name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of the public key used to sign requests.
///
/// Two forms are accepted: the legacy MD5 form (`a1:b2:...`, 16 hex pairs)
/// and the `SHA256:<base64>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct KeyId(String);

impl KeyId {
    /// Create a new key id from a fingerprint string.
    ///
    /// # Errors
    /// Returns an error if the fingerprint is in neither accepted form.
    pub fn new(id: impl Into<String>) -> Result<Self, crate::CoreError> {
        let id = id.into();
        if is_md5_fingerprint(&id) || is_sha256_fingerprint(&id) {
            Ok(Self(id))
        } else {
            Err(crate::CoreError::InvalidKeyId(id))
        }
    }

    /// Get the fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_md5_fingerprint(id: &str) -> bool {
    id.len() == MD5_FINGERPRINT_LEN
        && id
            .split(':')
            .all(|pair| pair.len() == 2 && pair.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn is_sha256_fingerprint(id: &str) -> bool {
    id.strip_prefix(SHA256_FINGERPRINT_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
}
