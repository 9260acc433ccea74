//! Configuration parsing and management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable consulted when `emulateExtraCACerts` is enabled.
pub const EXTRA_CA_CERTS_ENV: &str = "NODE_EXTRA_CA_CERTS";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Extra certificate settings
    #[serde(default)]
    pub certs: CertsConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The two user-facing certificate keys
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CertsConfig {
    /// Files whose certificates are trusted as root authorities, in order.
    /// Each entry should be an absolute path to a PEM (or DER) file.
    #[serde(default, rename = "extraCerts", alias = "extra_certs")]
    pub extra_certs: Vec<PathBuf>,

    /// Also load the file named by `NODE_EXTRA_CA_CERTS`
    #[serde(
        default,
        rename = "emulateExtraCACerts",
        alias = "emulate_extra_ca_certs"
    )]
    pub emulate_extra_ca_certs: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::config(format!("Invalid TOML: {}", e)))?;

        for (i, path) in config.certs.extra_certs.iter().enumerate() {
            if path.as_os_str().is_empty() {
                return Err(Error::config(format!(
                    "extraCerts #{}: path must not be empty",
                    i + 1
                )));
            }
        }

        Ok(config)
    }

    /// Create a configuration from the two certificate keys
    pub fn minimal(extra_certs: Vec<PathBuf>, emulate_extra_ca_certs: bool) -> Self {
        Self {
            certs: CertsConfig {
                extra_certs,
                emulate_extra_ca_certs,
            },
            logging: LoggingConfig::default(),
        }
    }
}
