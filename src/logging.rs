//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over verbosity flags, which take precedence
//! over the configured level. Output goes to stderr so stdout stays
//! machine-readable.

use crate::cli::Verbosity;
use crate::config::LoggingConfig;
use crate::errors::{Result, ServiceError};
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset
pub fn default_directive(config: &LoggingConfig, verbosity: Verbosity) -> String {
    verbosity
        .log_level()
        .unwrap_or(config.level.as_str())
        .to_ascii_lowercase()
}

/// Install the global subscriber; call once per process
pub fn init_logging(config: &LoggingConfig, verbosity: Verbosity) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(config, verbosity))
            .map_err(|e| ServiceError::ConfigError(format!("Invalid log filter: {}", e)))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json {
        builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| ServiceError::ConfigError(format!("Failed to initialize logging: {}", e)))
}
