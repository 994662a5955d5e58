//! Process-wide logging setup.
//!
//! Library code logs through the `log` macros and opens `tracing` spans
//! around jobs. [`init`] installs a `tracing-subscriber` formatter and
//! forwards `log` records into it.

use std::sync::OnceLock;

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::ConfigError;

static INITIALIZED: OnceLock<Result<(), String>> = OnceLock::new();

/// Builds the level filter. `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Logging(format!("Invalid log level '{}': {}", config.level, e)))
}

/// Installs the global subscriber. Later calls return the first outcome.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_filter(config)?;
    let json = config.json;

    INITIALIZED
        .get_or_init(|| install(filter, json))
        .clone()
        .map_err(ConfigError::Logging)
}

fn install(filter: EnvFilter, json: bool) -> Result<(), String> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(|e| format!("Failed to set global subscriber: {}", e))?;

    LogTracer::init().map_err(|e| format!("Failed to bridge log records: {}", e))?;

    log::debug!("Logging initialized (json={})", json);
    Ok(())
}
