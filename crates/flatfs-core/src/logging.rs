//! Tracing subscriber setup for binaries and test harnesses embedding flatfs.

use tracing_subscriber::EnvFilter;

use crate::error::{CoreError, CoreResult};

/// Initialize the global tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`. Calling this
/// more than once is harmless: later calls leave the first subscriber in place.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if `log_level` is not a valid filter.
pub fn init_tracing(log_level: &str) -> CoreResult<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .map_err(|e| CoreError::Config(format!("invalid log level filter {log_level}: {e}")))?
    };

    // A subscriber may already be installed by the host application.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    Ok(())
}
