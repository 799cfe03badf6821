//! CLI layer - Command-line interface
//!
//! Argument parsing, output formatting, signal handling, and the runners
//! for the terminal workflow and the HTTP server.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod presenter;
pub mod selection;
pub mod serve_app;
pub mod signals;

pub use app::{run_devices, run_record, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, RecordArgs, ServeArgs};
pub use presenter::Presenter;
pub use serve_app::run_serve;
