//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default directory recordings are written to
pub const DEFAULT_OUTPUT_DIR: &str = "recordings";
/// Default HTTP listen host
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default HTTP listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Accepted log levels
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub output_dir: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            output_dir: Some(DEFAULT_OUTPUT_DIR.to_string()),
            host: Some(DEFAULT_HOST.to_string()),
            port: Some(DEFAULT_PORT),
            log_level: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            output_dir: other.output_dir.or(self.output_dir),
            host: other.host.or(self.host),
            port: other.port.or(self.port),
            log_level: other.log_level.or(self.log_level),
        }
    }

    /// Get the recordings directory, or `recordings` if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        PathBuf::from(
            self.output_dir
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_OUTPUT_DIR),
        )
    }

    /// Get the listen host, or loopback if not set
    pub fn host_or_default(&self) -> &str {
        self.host
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_HOST)
    }

    /// Get the listen port, or 8080 if not set
    pub fn port_or_default(&self) -> u16 {
        self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT)
    }

    /// Get the configured log level, or `fallback` if not set/invalid
    pub fn log_level_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.log_level
            .as_deref()
            .filter(|l| VALID_LOG_LEVELS.contains(l))
            .unwrap_or(fallback)
    }

    /// `host:port` listen address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host_or_default(), self.port_or_default())
    }
}
