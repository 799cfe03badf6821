//! Audio backend adapters

mod cpal_backend;
mod simulated;

pub use cpal_backend::CpalBackend;
pub use simulated::SimulatedBackend;
