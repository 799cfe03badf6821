//! Route handlers

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::dto::{DeviceDto, RecordingDto, StartRequest, StartResponse, StatusDto, StopResponse};
use super::error::ApiError;
use super::server::AppState;
use crate::application::ports::AudioBackend;

pub async fn list_devices<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<DeviceDto>>, ApiError> {
    let capture = Arc::clone(&state.capture);
    let devices = tokio::task::spawn_blocking(move || capture.list_devices()).await??;
    Ok(Json(devices.into_iter().map(DeviceDto::from).collect()))
}

pub async fn status<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<StatusDto>, ApiError> {
    // A start or stop holds the session lock while streams and writers settle
    let capture = Arc::clone(&state.capture);
    let status = tokio::task::spawn_blocking(move || capture.status()).await?;
    Ok(Json(status.into()))
}

pub async fn start<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, ApiError> {
    let Json(request) = body?;
    let capture = Arc::clone(&state.capture);
    let channels =
        tokio::task::spawn_blocking(move || capture.start(&request.device_indices)).await??;

    info!(channels = channels.len(), "recording started via http");
    Ok(Json(StartResponse::new(&channels)))
}

pub async fn stop<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<StopResponse>, ApiError> {
    let capture = Arc::clone(&state.capture);
    let recordings = tokio::task::spawn_blocking(move || capture.stop()).await??;

    info!(files = recordings.len(), "recording stopped via http");
    Ok(Json(StopResponse::new(&recordings)))
}

pub async fn list_recordings<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<RecordingDto>>, ApiError> {
    let entries = state.library.list().await?;
    Ok(Json(entries.into_iter().map(RecordingDto::from).collect()))
}

pub async fn download<B: AudioBackend + 'static>(
    State(state): State<AppState<B>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = state.library.resolve(&filename).await?;
    let read_failed =
        |e: std::io::Error| ApiError::Internal(format!("Failed to read {}: {}", filename, e));
    let file = tokio::fs::File::open(&path).await.map_err(read_failed)?;
    let length = file.metadata().await.map_err(read_failed)?.len();

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename.replace('"', "_")),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}
