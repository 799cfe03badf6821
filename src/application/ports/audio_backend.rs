//! Audio backend port interfaces

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::audio::AudioStreamDescriptor;
use crate::domain::error::CaptureError;

/// How a device is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Microphone or virtual input
    Capture,
    /// Output device recorded through the OS loopback path
    Loopback,
}

impl DeviceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Loopback => "loopback",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a device enumeration.
///
/// `index` is positional and only meaningful for the enumeration that
/// produced it; backends use `name` to detect a device list that changed
/// in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub kind: DeviceKind,
}

/// Receives little-endian 16-bit mono PCM bytes on the backend's thread.
///
/// Must return quickly: no blocking I/O and no locks shared with the
/// session.
pub type DataCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// A live stream bound to one device
pub trait CaptureStream: Send {
    /// Format of the bytes handed to the data callback
    fn descriptor(&self) -> AudioStreamDescriptor;

    /// Begin delivering buffers
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stop delivering buffers and release the hardware stream.
    ///
    /// Once this returns the data callback is never invoked again.
    /// Stopping twice is a no-op.
    fn stop(&mut self);
}

/// Port for the native audio I/O library
pub trait AudioBackend: Send + Sync {
    /// Enumerate selectable devices, capture devices first.
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Open a stream on `device`.
    ///
    /// The backend negotiates a format as close to `requested` as the
    /// device allows; the returned stream reports what it delivers.
    fn open_stream(
        &self,
        device: &DeviceInfo,
        requested: AudioStreamDescriptor,
        on_data: DataCallback,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DeviceKind::Loopback).unwrap(),
            "\"loopback\""
        );
        assert_eq!(DeviceKind::Capture.to_string(), "capture");
    }
}
