//! Logging setup.

use tracing_subscriber::EnvFilter;

use warden_core::{LoggingConfig, Result, WardenError};

/// Builds the event filter: `RUST_LOG` when set, otherwise the configured
/// directive.
///
/// # Errors
///
/// Returns [`WardenError::Config`] if the configured directive is invalid.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter)
        .map_err(|e| WardenError::config(format!("invalid logging.filter {:?}: {e}", config.filter)))
}

/// Installs a global `fmt` subscriber.
///
/// Calling this again, or after another subscriber was installed, leaves the
/// existing subscriber in place.
///
/// # Errors
///
/// Returns [`WardenError::Config`] if the configured directive is invalid.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
    }
    Ok(())
}
