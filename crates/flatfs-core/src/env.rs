//! Environment variable lookup.
//!
//! Connection and credential settings are read from prefixed environment
//! variables. Each logical name (for example `KEY_ID`) is looked up under every
//! prefix in [`ENV_PREFIXES`] in order; the first non-empty value wins.

/// Prefixes tried, in order, when resolving a logical environment name.
pub const ENV_PREFIXES: [&str; 2] = ["TRITON_", "SDC_"];

/// Look up a logical setting such as `URL` or `KEY_ID` in the environment.
///
/// Returns `None` when the variable is unset or empty under every prefix.
///
/// # Examples
///
/// ```
/// use flatfs_core::get_env;
///
/// assert!(get_env("SURELY_UNSET_FLATFS_SETTING").is_none());
/// ```
#[must_use]
pub fn get_env(name: &str) -> Option<String> {
    ENV_PREFIXES.iter().find_map(|prefix| {
        std::env::var(format!("{prefix}{name}"))
            .ok()
            .filter(|v| !v.is_empty())
    })
}
