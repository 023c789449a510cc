//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::MigrateError;
use std::env::{self, VarError};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "STRATA_LOG";

/// Install the global tracing subscriber
///
/// Uses `STRATA_LOG` when set, the configured filter otherwise.
///
/// # Errors
/// Returns [`MigrateError::Config`] if the chosen filter does not parse,
/// `STRATA_LOG` is not unicode, or a global subscriber is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<(), MigrateError> {
    let filter = select_filter(env::var(LOG_ENV), config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| MigrateError::Config(format!("tracing subscriber: {e}")))
}

fn select_filter(
    from_env: Result<String, VarError>,
    config: &LoggingConfig,
) -> Result<EnvFilter, MigrateError> {
    let (source, directives) = match from_env {
        Ok(directives) => (LOG_ENV, directives),
        Err(VarError::NotPresent) => ("log filter", config.filter.clone()),
        Err(e @ VarError::NotUnicode(_)) => {
            return Err(MigrateError::Config(format!("{LOG_ENV}: {e}")));
        }
    };
    EnvFilter::try_new(&directives)
        .map_err(|e| MigrateError::Config(format!("{source} '{directives}': {e}")))
}
