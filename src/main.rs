//! Multicap CLI entry point

use std::process::ExitCode;

use clap::Parser;

use multicap::cli::{
    app::{init_logging, load_merged_config, TERMINAL_LOG_LEVEL},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
    run_devices, run_record, run_serve,
    serve_app::SERVE_LOG_LEVEL,
    EXIT_ERROR,
};
use multicap::domain::config::AppConfig;
use multicap::infrastructure::XdgConfigStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let presenter = Presenter::new();

    match cli.into_command() {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Devices => {
            let config = load_merged_config(AppConfig::empty()).await;
            init_logging(&config, TERMINAL_LOG_LEVEL);
            run_devices(config).await
        }
        Commands::Record(args) => {
            let cli_config = AppConfig {
                output_dir: args.output.as_ref().map(|p| p.to_string_lossy().into_owned()),
                ..Default::default()
            };
            let config = load_merged_config(cli_config).await;
            init_logging(&config, TERMINAL_LOG_LEVEL);
            run_record(args, config).await
        }
        Commands::Serve(args) => {
            let cli_config = AppConfig {
                output_dir: args.output.as_ref().map(|p| p.to_string_lossy().into_owned()),
                host: args.host,
                port: args.port,
                log_level: None,
            };
            let config = load_merged_config(cli_config).await;
            init_logging(&config, SERVE_LOG_LEVEL);
            run_serve(config).await
        }
    }
}
