//! Driver configuration.
//!
//! [`DriverConfig`] can be built directly, loaded from the environment, or
//! parsed from the loosely-typed parameter map a registry hands to its
//! storage driver factory.

use std::collections::HashMap;

use flatfs_core::{CoreError, CoreResult, get_env};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use typed_builder::TypedBuilder;

/// Default size of each multipart part, and the threshold below which
/// content is stored with a single put.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Storage driver configuration.
///
/// # Examples
///
/// ```
/// use flatfs_driver::config::{DEFAULT_CHUNK_SIZE, DriverConfig};
///
/// let config = DriverConfig::builder()
///     .root_directory("/registry/stor/docker".to_owned())
///     .build();
/// assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Directory in the object store under which all paths live.
    pub root_directory: String,

    /// Multipart part size in bytes.
    #[builder(default = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

impl DriverConfig {
    /// Parse registry driver parameters.
    ///
    /// | Parameter | Required | Notes |
    /// |-----------|----------|-------|
    /// | `rootdirectory` | yes, or `path` | |
    /// | `path` | yes, or `rootdirectory` | accepted for older configurations |
    /// | `chunksize` | no | integer or numeric string, must be positive |
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when no root is given or a value has
    /// the wrong type.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use flatfs_driver::config::DriverConfig;
    ///
    /// let mut params = HashMap::new();
    /// params.insert("path".to_owned(), serde_json::json!("/registry/stor"));
    /// params.insert("chunksize".to_owned(), serde_json::json!("1048576"));
    /// let config = DriverConfig::from_parameters(&params).unwrap();
    /// assert_eq!(config.root_directory, "/registry/stor");
    /// assert_eq!(config.chunk_size, 1_048_576);
    ///
    /// assert!(DriverConfig::from_parameters(&HashMap::new()).is_err());
    /// ```
    pub fn from_parameters<S: std::hash::BuildHasher>(
        params: &HashMap<String, Value, S>,
    ) -> CoreResult<Self> {
        let root_directory = ["rootdirectory", "path"]
            .iter()
            .find_map(|name| params.get(*name))
            .ok_or_else(|| CoreError::Config("No path parameter provided".to_owned()))?;
        let root_directory = root_directory
            .as_str()
            .ok_or_else(|| {
                CoreError::Config(format!("path must be a string, got {root_directory}"))
            })?
            .to_owned();

        let chunk_size = match params.get("chunksize") {
            None | Some(Value::Null) => DEFAULT_CHUNK_SIZE,
            Some(value) => parse_chunk_size(value)?,
        };

        Ok(Self {
            root_directory,
            chunk_size,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// | Logical name | Required | Default |
    /// |--------------|----------|---------|
    /// | `ROOT_DIRECTORY` | yes | |
    /// | `CHUNK_SIZE` | no | 10 MiB |
    ///
    /// Names are resolved through [`get_env`], so `TRITON_ROOT_DIRECTORY`
    /// and `SDC_ROOT_DIRECTORY` both work.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the root is unset or the chunk size
    /// is not a positive integer.
    pub fn from_env() -> CoreResult<Self> {
        let root_directory = get_env("ROOT_DIRECTORY").ok_or_else(|| {
            CoreError::Config("no root directory configured (set TRITON_ROOT_DIRECTORY)".to_owned())
        })?;
        let mut config = Self::builder().root_directory(root_directory).build();
        if let Some(v) = get_env("CHUNK_SIZE") {
            config.chunk_size = parse_chunk_size(&Value::String(v))?;
        }
        Ok(config)
    }
}

fn parse_chunk_size(value: &Value) -> CoreResult<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            CoreError::Config(format!("chunksize must be a positive integer, got {value}"))
        })
}
