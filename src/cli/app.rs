//! App runners for the terminal workflow

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::application::ports::{AudioBackend, ConfigStore, DeviceInfo};
use crate::application::{CaptureService, FinishedRecording};
use crate::domain::config::AppConfig;
use crate::infrastructure::{CpalBackend, XdgConfigStore};

use super::args::RecordArgs;
use super::presenter::{format_recording_progress, Presenter};
use super::selection::parse_device_selection;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Default log level for interactive commands
pub const TERMINAL_LOG_LEVEL: &str = "warn";

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Load and merge configuration: defaults < file < env/CLI.
///
/// Environment variables reach `cli_config` through clap's `env` support.
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            Presenter::new().warn(&format!("Ignoring config file: {}", e));
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &AppConfig, fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level_or(fallback)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn open_backend(presenter: &Presenter) -> Option<CpalBackend> {
    match CpalBackend::new() {
        Ok(backend) => Some(backend),
        Err(e) => {
            presenter.error(&e.to_string());
            None
        }
    }
}

fn list_or_report<B: AudioBackend>(
    service: &CaptureService<B>,
    presenter: &Presenter,
) -> Option<Vec<DeviceInfo>> {
    match service.list_devices() {
        Ok(devices) => Some(devices),
        Err(e) => {
            presenter.error(&e.to_string());
            None
        }
    }
}

/// `multicap devices`
pub async fn run_devices(config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    let Some(backend) = open_backend(&presenter) else {
        return ExitCode::from(EXIT_ERROR);
    };

    let service = CaptureService::new(backend, config.output_dir_or_default());
    let Some(devices) = list_or_report(&service, &presenter) else {
        return ExitCode::from(EXIT_ERROR);
    };

    if devices.is_empty() {
        presenter.warn("No audio input devices found");
    }
    presenter.device_list(&devices);
    ExitCode::from(EXIT_SUCCESS)
}

/// `multicap` / `multicap record`
pub async fn run_record(args: RecordArgs, config: AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    let Some(backend) = open_backend(&presenter) else {
        return ExitCode::from(EXIT_ERROR);
    };

    let shutdown = ShutdownSignal::new();
    if let Err(e) = shutdown.setup().await {
        presenter.error(&format!("Failed to setup signal handler: {}", e));
        return ExitCode::from(EXIT_ERROR);
    }

    let service = Arc::new(CaptureService::new(backend, config.output_dir_or_default()));
    let mut input = spawn_stdin_lines();
    let code = record_session(service, args.devices, &mut input, &shutdown, presenter).await;
    ExitCode::from(code)
}

/// Forward stdin lines from a plain thread.
///
/// The thread is detached so a pending read never holds up runtime
/// shutdown; the channel closes at end of input.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(4);
    let spawned = std::thread::Builder::new()
        .name("multicap-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "stdin reader unavailable");
    }
    rx
}

/// Select, record until Enter or shutdown, and report saved files.
/// Returns the exit code.
///
/// Generic over the backend and fed lines through `input` so the workflow
/// runs without hardware or a terminal.
pub async fn record_session<B: AudioBackend + 'static>(
    service: Arc<CaptureService<B>>,
    selection: Option<String>,
    input: &mut mpsc::Receiver<String>,
    shutdown: &ShutdownSignal,
    mut presenter: Presenter,
) -> u8 {
    let Some(devices) = list_or_report(&service, &presenter) else {
        return EXIT_ERROR;
    };
    if devices.is_empty() {
        presenter.error("No audio input devices found");
        return EXIT_ERROR;
    }

    let selection = match selection {
        Some(s) => s,
        None => {
            presenter.device_list(&devices);
            presenter.prompt("Select devices (comma-separated indices):");
            tokio::select! {
                line = input.recv() => match line {
                    Some(line) => line,
                    None => {
                        presenter.error("No selection given");
                        return EXIT_USAGE_ERROR;
                    }
                },
                _ = shutdown.wait() => return EXIT_SUCCESS,
            }
        }
    };

    let indices = match parse_device_selection(&selection) {
        Ok(indices) => indices,
        Err(e) => {
            presenter.error(&e.to_string());
            return EXIT_USAGE_ERROR;
        }
    };

    let starter = Arc::clone(&service);
    let channels = match tokio::task::spawn_blocking(move || starter.start(&indices)).await {
        Ok(Ok(channels)) => channels,
        Err(e) => {
            presenter.error(&format!("Capture task failed: {}", e));
            return EXIT_ERROR;
        }
        Ok(Err(e)) => {
            presenter.error(&e.to_string());
            return if e.is_client_error() {
                EXIT_USAGE_ERROR
            } else {
                EXIT_ERROR
            };
        }
    };

    presenter.info(&format!("Recording {} device(s):", channels.len()));
    for channel in &channels {
        presenter.recording_to(&channel.device_name, &channel.path);
    }
    info!(channels = channels.len(), "recording started");

    presenter.start_spinner(&format_recording_progress(Duration::ZERO, 0));
    wait_for_stop(&service, shutdown, input, &presenter).await;

    let stopper = Arc::clone(&service);
    match tokio::task::spawn_blocking(move || stopper.stop()).await {
        Ok(Ok(recordings)) => {
            presenter.spinner_success("Recording stopped");
            report_saved(&recordings, &presenter);
            EXIT_SUCCESS
        }
        Ok(Err(e)) => {
            presenter.spinner_fail(&e.to_string());
            EXIT_ERROR
        }
        Err(e) => {
            presenter.spinner_fail(&format!("Capture task failed: {}", e));
            EXIT_ERROR
        }
    }
}

/// Block until an input line or a shutdown signal, updating the spinner.
///
/// Closed input leaves only the signal as a way to stop.
async fn wait_for_stop<B: AudioBackend>(
    service: &CaptureService<B>,
    shutdown: &ShutdownSignal,
    input: &mut mpsc::Receiver<String>,
    presenter: &Presenter,
) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            line = input.recv(), if input_open => match line {
                Some(_) => break,
                None => input_open = false,
            },
            _ = ticker.tick() => {
                let elapsed = service.elapsed().unwrap_or_default();
                presenter.update_recording_progress(elapsed, service.bytes_recorded());
            }
        }
    }
}

fn report_saved(recordings: &[FinishedRecording], presenter: &Presenter) {
    for recording in recordings {
        presenter.saved(recording);
    }
}
