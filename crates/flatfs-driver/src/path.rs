//! Path validation and path-to-key mapping.
//!
//! Driver paths are absolute, `/`-separated, and made of segments drawn from
//! `[A-Za-z0-9._-]`. The segments `.` and `..` are rejected. A single trailing
//! slash is accepted and ignored.
//!
//! A [`KeyMapper`] places every path under a fixed root directory:
//!
//! ```
//! use flatfs_driver::path::KeyMapper;
//!
//! let mapper = KeyMapper::new("/registry/stor/docker/");
//! let key = mapper.to_key("/a/b").unwrap();
//! assert_eq!(key, "registry/stor/docker/a/b");
//! assert_eq!(mapper.to_path(&key).unwrap(), "/a/b");
//! assert_eq!(mapper.dir_prefix("/a").unwrap(), "registry/stor/docker/a/");
//! ```

use crate::error::{DriverError, DriverResult};

/// The root path.
pub const ROOT: &str = "/";

const SEPARATOR: char = '/';

/// Validate `path` and return its canonical form (no trailing slash).
///
/// The root `/` is accepted only when `allow_root` is set.
///
/// # Errors
///
/// Returns [`DriverError::InvalidPath`] for any malformed path.
///
/// # Examples
///
/// ```
/// use flatfs_driver::path::validate_path;
///
/// assert_eq!(validate_path("/a/b/", false).unwrap(), "/a/b");
/// assert_eq!(validate_path("/", true).unwrap(), "/");
/// assert!(validate_path("/", false).is_err());
/// assert!(validate_path("/a/../b", false).is_err());
/// assert!(validate_path("a/b", false).is_err());
/// ```
pub fn validate_path(path: &str, allow_root: bool) -> DriverResult<&str> {
    let invalid = || DriverError::InvalidPath {
        path: path.to_owned(),
    };

    if path == ROOT {
        return if allow_root { Ok(ROOT) } else { Err(invalid()) };
    }

    let rest = path.strip_prefix(SEPARATOR).ok_or_else(invalid)?;
    let rest = rest.strip_suffix(SEPARATOR).unwrap_or(rest);
    if rest.is_empty() {
        return Err(invalid());
    }

    for segment in rest.split(SEPARATOR) {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        if !segment.bytes().all(is_segment_byte) {
            return Err(invalid());
        }
    }

    Ok(&path[..=rest.len()])
}

fn is_segment_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-'
}

/// Join a validated parent path and a single child segment.
#[must_use]
pub fn join(parent: &str, segment: &str) -> String {
    if parent == ROOT {
        format!("{ROOT}{segment}")
    } else {
        format!("{parent}{SEPARATOR}{segment}")
    }
}

/// Translates between driver paths and object store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapper {
    /// Root directory with surrounding slashes trimmed; may be empty.
    root: String,
}

impl KeyMapper {
    /// Create a mapper rooted at `root_directory`.
    ///
    /// Surrounding slashes are ignored, so `/a/b/` and `a/b` are equivalent.
    #[must_use]
    pub fn new(root_directory: &str) -> Self {
        Self {
            root: root_directory.trim_matches(SEPARATOR).to_owned(),
        }
    }

    /// The trimmed root directory.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Prefix shared by every key this mapper produces.
    #[must_use]
    pub fn root_prefix(&self) -> String {
        if self.root.is_empty() {
            String::new()
        } else {
            format!("{}{SEPARATOR}", self.root)
        }
    }

    /// Map a non-root path to its object key.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidPath`] if the path is malformed or is `/`.
    pub fn to_key(&self, path: &str) -> DriverResult<String> {
        let path = validate_path(path, false)?;
        Ok(format!("{}{}", self.root_prefix(), &path[1..]))
    }

    /// Map an object key back to its path.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidPath`] if the key lies outside the root
    /// or does not form a valid path.
    pub fn to_path(&self, key: &str) -> DriverResult<String> {
        let prefix = self.root_prefix();
        let rest = key
            .strip_prefix(prefix.as_str())
            .ok_or_else(|| DriverError::InvalidPath {
                path: key.to_owned(),
            })?;
        let path = format!("{ROOT}{rest}");
        validate_path(&path, false)?;
        Ok(path)
    }

    /// Key prefix under which every descendant of `path` lives.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidPath`] if the path is malformed.
    pub fn dir_prefix(&self, path: &str) -> DriverResult<String> {
        if validate_path(path, true)? == ROOT {
            return Ok(self.root_prefix());
        }
        let mut key = self.to_key(path)?;
        key.push(SEPARATOR);
        Ok(key)
    }
}
