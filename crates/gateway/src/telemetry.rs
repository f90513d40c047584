//! Telemetry initialisation for the gateway.
//!
//! A lightweight setup: structured JSON logs to stdout at the configured
//! level. Card values and encryption keys must never appear in any log
//! field — handlers log error summaries only, not payloads.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber for the gateway.
///
/// # Errors
///
/// Returns an error if the subscriber has already been set.
pub fn init(log_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise gateway tracing subscriber: {e}"))
}
