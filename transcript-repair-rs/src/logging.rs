//! # Structured Logging
//!
//! Installs a global `tracing` subscriber writing to stderr, so that report
//! text on stdout stays machine-readable.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::errors::{RepairError, RepairResult};

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to use JSON formatting
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
        }
    }
}

/// Initializes the structured logging system. Later calls are no-ops.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> RepairResult<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RepairError::Logging(format!("invalid log level {:?}: {}", config.level, e)))?;

    let registry = Registry::default().with(filter);

    let result = if config.json_format {
        let layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    };

    result.map_err(|e| RepairError::Logging(format!("Failed to set global subscriber: {}", e)))?;
    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::debug!(
        level = %config.level,
        json = config.json_format,
        "Structured logging initialized"
    );
    Ok(())
}
