//! Domain error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by device enumeration and the capture session
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Failed to initialize audio backend: {0}")]
    BackendInitFailed(String),

    #[error("Failed to enumerate audio devices: {0}")]
    DeviceEnumerationFailed(String),

    #[error("Invalid device index: {0}")]
    InvalidDeviceIndex(i64),

    #[error("No devices selected")]
    NoDevicesSelected,

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not currently recording")]
    NotRecording,

    #[error("Failed to create {}: {reason}", path.display())]
    FileCreateFailed { path: PathBuf, reason: String },

    #[error("Failed to initialize device {device}: {reason}")]
    StreamInitFailed { device: String, reason: String },

    #[error("Failed to start device {device}: {reason}")]
    StreamStartFailed { device: String, reason: String },
}

impl CaptureError {
    /// True when the caller asked for something invalid, as opposed to a
    /// backend or filesystem failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDeviceIndex(_)
                | Self::NoDevicesSelected
                | Self::AlreadyRecording
                | Self::NotRecording
        )
    }
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors() {
        assert!(CaptureError::InvalidDeviceIndex(7).is_client_error());
        assert!(CaptureError::NoDevicesSelected.is_client_error());
        assert!(CaptureError::AlreadyRecording.is_client_error());
        assert!(CaptureError::NotRecording.is_client_error());
    }

    #[test]
    fn system_errors() {
        assert!(!CaptureError::BackendInitFailed("x".into()).is_client_error());
        assert!(!CaptureError::StreamStartFailed {
            device: "Mic".into(),
            reason: "busy".into()
        }
        .is_client_error());
    }

    #[test]
    fn file_create_message_names_path() {
        let err = CaptureError::FileCreateFailed {
            path: PathBuf::from("recordings/a.wav"),
            reason: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("recordings/a.wav"));
        assert!(msg.contains("permission denied"));
    }
}
