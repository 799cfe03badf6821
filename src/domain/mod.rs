//! Domain layer - Core business logic
//!
//! Contains value objects, the WAV header codec, the session state
//! machine and domain errors. Apart from the header codec's generic
//! `Write + Seek` helpers this layer performs no I/O.

pub mod audio;
pub mod config;
pub mod error;
pub mod recording;
pub mod session;

// Re-export common types
pub use audio::{AudioStreamDescriptor, WavHeader};
pub use config::AppConfig;
pub use error::*;
pub use session::{SessionState, SessionStatus};
