//! Multicap - multi-device audio capture to WAV
//!
//! Records several audio input devices at once, each to its own 16-bit
//! mono PCM WAV file, driven from the terminal or an HTTP API.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: WAV header codec, stream descriptor, file naming, session state, errors
//! - **Application**: Capture session, channel writers, recordings library, port traits
//! - **Infrastructure**: cpal and simulated audio backends, TOML config store
//! - **Web**: axum JSON API
//! - **CLI**: Argument parsing, terminal workflow, signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod web;
