//! Serve command runner

use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::info;

use crate::application::CaptureService;
use crate::domain::config::AppConfig;
use crate::infrastructure::CpalBackend;
use crate::web::{self, AppState};

use super::app::{EXIT_ERROR, EXIT_SUCCESS};
use super::presenter::Presenter;
use super::signals::ShutdownSignal;

/// Default log level for the server
pub const SERVE_LOG_LEVEL: &str = "info";

/// Run the HTTP control server until Ctrl-C or SIGTERM
pub async fn run_serve(config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();

    let backend = match CpalBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup().await {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let address = config.listen_address();
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            presenter.error(&format!("Failed to bind {}: {}", address, e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let output_dir = config.output_dir_or_default();
    info!(output_dir = %output_dir.display(), "recordings directory");
    presenter.info(&format!(
        "Serving on http://{} | recordings: {} | Ctrl-C: exit",
        listener.local_addr().map(|a| a.to_string()).unwrap_or(address),
        output_dir.display()
    ));

    let state = AppState::new(CaptureService::new(backend, output_dir));
    match web::serve(listener, state, shutdown.into_future()).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            presenter.error(&format!("Server error: {}", e));
            ExitCode::from(EXIT_ERROR)
        }
    }
}
