//! HTTP control surface
//!
//! JSON API for listing devices, starting and stopping a session and
//! browsing recordings, served with axum.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{router, serve, AppState};
