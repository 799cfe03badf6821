//! Router and server lifecycle

use std::future::Future;
use std::io;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::handlers;
use crate::application::ports::AudioBackend;
use crate::application::{CaptureService, RecordingLibrary};

/// Shared handler state
pub struct AppState<B: AudioBackend> {
    pub capture: Arc<CaptureService<B>>,
    pub library: Arc<RecordingLibrary>,
}

impl<B: AudioBackend> AppState<B> {
    /// State whose library lists the capture service's output directory
    pub fn new(capture: CaptureService<B>) -> Self {
        let library = RecordingLibrary::new(capture.output_dir());
        Self {
            capture: Arc::new(capture),
            library: Arc::new(library),
        }
    }
}

impl<B: AudioBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            capture: Arc::clone(&self.capture),
            library: Arc::clone(&self.library),
        }
    }
}

pub fn router<B: AudioBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/api/devices", get(handlers::list_devices::<B>))
        .route("/api/status", get(handlers::status::<B>))
        .route("/api/start", post(handlers::start::<B>))
        .route("/api/stop", post(handlers::stop::<B>))
        .route("/api/recordings", get(handlers::list_recordings::<B>))
        .route("/recordings/:filename", get(handlers::download::<B>))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then finalize any active session.
pub async fn serve<B, F>(listener: TcpListener, state: AppState<B>, shutdown: F) -> io::Result<()>
where
    B: AudioBackend + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    let capture = Arc::clone(&state.capture);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server stopped");
    finalize(capture).await;
    Ok(())
}

async fn finalize<B: AudioBackend + 'static>(capture: Arc<CaptureService<B>>) {
    if !capture.is_recording() {
        return;
    }

    match tokio::task::spawn_blocking(move || capture.stop()).await {
        Ok(Ok(recordings)) => {
            for r in &recordings {
                info!(path = %r.path.display(), bytes = r.payload_bytes, "finalized on shutdown");
            }
        }
        Ok(Err(e)) => warn!(error = %e, "failed to stop session on shutdown"),
        Err(e) => warn!(error = %e, "stop task failed on shutdown"),
    }
}
