//! Configuration loading and validation for the gateway.
//!
//! All values are read from environment variables at startup. The process
//! will exit with a clear error message if any value cannot be parsed.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Maximum accepted multipart upload size in bytes. Documents are held
    /// in memory for the whole conversion, so this bounds memory per
    /// request as well.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value fails
    /// validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build gateway configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise gateway configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be non-zero");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn validate_rejects_zero_upload_limit() {
        let cfg = Config {
            listen_port: default_listen_port(),
            max_upload_bytes: 0,
            log_level: default_log_level(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_port() {
        let cfg = Config {
            listen_port: 0,
            max_upload_bytes: default_max_upload_bytes(),
            log_level: default_log_level(),
        };
        assert!(cfg.validate().is_err());
    }
}
