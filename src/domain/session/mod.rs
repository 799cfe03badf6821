//! Recording session lifecycle

pub mod state;

pub use state::{SessionState, SessionStatus};
