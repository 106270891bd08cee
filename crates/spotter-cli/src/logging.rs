// crates/spotter-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber installation for the CLI.
// Purpose: Route library logs to stderr in text or JSON form.
// Dependencies: spotter-config, thiserror, tracing-subscriber
// ============================================================================

//! ## Overview
//! Logs always go to stderr so that reports printed on stdout stay clean.
//! A non-empty `RUST_LOG` replaces the configured level entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use spotter_config::LogFormat;
use spotter_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logging setup errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoggingError {
    /// The level or `RUST_LOG` directive could not be parsed.
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter {
        /// Rejected filter text.
        filter: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

// ============================================================================
// SECTION: Setup
// ============================================================================

/// Builds the filter from `RUST_LOG` (when set) or the configured level.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] when the chosen text is malformed.
pub fn resolve_filter(env: Option<&str>, level: &str) -> Result<EnvFilter, LoggingError> {
    let filter = env.map(str::trim).filter(|value| !value.is_empty()).unwrap_or_else(|| level.trim());
    EnvFilter::try_new(filter).map_err(|err| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        message: err.to_string(),
    })
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(env.as_deref(), &config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| LoggingError::Install(err.to_string()))
}
