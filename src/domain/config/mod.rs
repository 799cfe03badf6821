//! Configuration value objects

pub mod app_config;

pub use app_config::{AppConfig, DEFAULT_HOST, DEFAULT_OUTPUT_DIR, DEFAULT_PORT, VALID_LOG_LEVELS};
