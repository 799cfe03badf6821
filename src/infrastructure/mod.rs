//! Infrastructure layer - Adapter implementations
//!
//! Concrete implementations of the port interfaces: the cpal audio
//! backend, an in-memory backend and the TOML config store.

pub mod audio;
pub mod config;

pub use audio::{CpalBackend, SimulatedBackend};
pub use config::XdgConfigStore;
