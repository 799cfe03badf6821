//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod audio_backend;
pub mod config;

// Re-export common types
pub use audio_backend::{AudioBackend, CaptureStream, DataCallback, DeviceInfo, DeviceKind};
pub use config::ConfigStore;
