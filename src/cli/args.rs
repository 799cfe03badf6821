//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Multicap - record several audio devices at once, each to its own WAV file
#[derive(Parser, Debug)]
#[command(name = "multicap")]
#[command(version)]
#[command(about = "Record several audio input devices at once, one WAV file per device")]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Options for the default `record` workflow
    #[command(flatten)]
    pub record: RecordArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to run; no subcommand means `record`
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Record(self.record))
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the terminal (default)
    Record(RecordArgs),
    /// List audio devices and exit
    Devices,
    /// Run the HTTP control server
    Serve(ServeArgs),
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordArgs {
    /// Comma-separated device indices (prompted for when omitted)
    #[arg(short = 'd', long, value_name = "INDICES")]
    pub devices: Option<String>,

    /// Directory recordings are written to
    #[arg(short = 'o', long, value_name = "DIR", env = "MULTICAP_OUTPUT_DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, value_name = "HOST", env = "MULTICAP_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT", env = "MULTICAP_PORT")]
    pub port: Option<u16>,

    /// Directory recordings are written to and served from
    #[arg(short = 'o', long, value_name = "DIR", env = "MULTICAP_OUTPUT_DIR")]
    pub output: Option<PathBuf>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &["output_dir", "host", "port", "log_level"];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
