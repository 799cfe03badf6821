//! Capture session use case
//!
//! Starts and stops a set of capture channels as one unit. One mutex
//! guards the session for the whole of every start and stop, so status
//! readers and competing callers only ever see a fully started or fully
//! stopped session. Device callbacks never touch that lock.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{info, warn};

use super::channel::{ActiveChannel, CaptureChannel, FinishedRecording};
use super::ports::{AudioBackend, DeviceInfo};
use crate::domain::audio::AudioStreamDescriptor;
use crate::domain::error::CaptureError;
use crate::domain::recording::RecordingNamer;
use crate::domain::session::{SessionState, SessionStatus};

#[derive(Default)]
struct Session {
    state: SessionState,
    channels: Vec<CaptureChannel>,
    started_at: Option<DateTime<Local>>,
}

/// Coordinates the single recording session of the process
pub struct CaptureService<B: AudioBackend> {
    backend: B,
    output_dir: PathBuf,
    requested: AudioStreamDescriptor,
    session: Mutex<Session>,
}

impl<B: AudioBackend> CaptureService<B> {
    /// Create a service recording into `output_dir` in the capture format
    pub fn new(backend: B, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_descriptor(backend, output_dir, AudioStreamDescriptor::CAPTURE)
    }

    /// Create a service requesting a specific stream format
    pub fn with_descriptor(
        backend: B,
        output_dir: impl Into<PathBuf>,
        requested: AudioStreamDescriptor,
    ) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            requested,
            session: Mutex::new(Session::default()),
        }
    }

    /// Directory recordings are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enumerate selectable devices.
    ///
    /// Indices are only valid until the device set changes.
    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        self.backend.devices()
    }

    /// Start recording the devices at `indices`, in the order given.
    ///
    /// Duplicate indices are recorded once. If any device fails, every
    /// channel opened by this call is stopped and its file removed before
    /// the error is returned.
    pub fn start(&self, indices: &[i64]) -> Result<Vec<ActiveChannel>, CaptureError> {
        let mut session = self.lock();
        session.state.ensure_idle()?;

        let selection = dedup_preserving_order(indices);
        if selection.is_empty() {
            return Err(CaptureError::NoDevicesSelected);
        }

        let devices = self.backend.devices()?;
        let selected = selection
            .iter()
            .map(|&index| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| devices.get(i))
                    .cloned()
                    .ok_or(CaptureError::InvalidDeviceIndex(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        fs::create_dir_all(&self.output_dir).map_err(|e| CaptureError::FileCreateFailed {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        })?;

        let started_at = Local::now();
        let mut namer = RecordingNamer::new(&self.output_dir, &started_at);
        let mut channels: Vec<CaptureChannel> = Vec::with_capacity(selected.len());

        for device in selected {
            let path = namer.path_for(&device.name);
            match CaptureChannel::open(&self.backend, device, &path, self.requested) {
                Ok(channel) => channels.push(channel),
                Err(e) => {
                    warn!(error = %e, opened = channels.len(), "start failed, rolling back");
                    for channel in channels.into_iter().rev() {
                        channel.discard();
                    }
                    return Err(e);
                }
            }
        }

        session.state.begin()?;
        let active: Vec<ActiveChannel> = channels.iter().map(CaptureChannel::summary).collect();
        session.channels = channels;
        session.started_at = Some(started_at);

        info!(devices = active.len(), "recording started");
        Ok(active)
    }

    /// Stop every channel and finalize its file.
    pub fn stop(&self) -> Result<Vec<FinishedRecording>, CaptureError> {
        let mut session = self.lock();
        session.state.end()?;

        let channels = std::mem::take(&mut session.channels);
        session.started_at = None;

        let finished: Vec<FinishedRecording> =
            channels.into_iter().map(CaptureChannel::close).collect();

        info!(devices = finished.len(), "recording stopped");
        Ok(finished)
    }

    /// Current session state
    pub fn status(&self) -> SessionStatus {
        let session = self.lock();
        SessionStatus {
            is_recording: session.state.is_recording(),
            devices: session
                .channels
                .iter()
                .map(|c| c.device().name.clone())
                .collect(),
        }
    }

    /// True while a session is active
    pub fn is_recording(&self) -> bool {
        self.lock().state.is_recording()
    }

    /// Time since the active session started
    pub fn elapsed(&self) -> Option<Duration> {
        let session = self.lock();
        session
            .started_at
            .and_then(|t| (Local::now() - t).to_std().ok())
    }

    /// Payload bytes written across all active channels
    pub fn bytes_recorded(&self) -> u64 {
        self.lock()
            .channels
            .iter()
            .map(CaptureChannel::bytes_written)
            .sum()
    }
}

impl<B: AudioBackend> Drop for CaptureService<B> {
    fn drop(&mut self) {
        // Leave no file with a placeholder header behind
        if self.is_recording() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "failed to stop recording on shutdown");
            }
        }
    }
}

fn dedup_preserving_order(indices: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::with_capacity(indices.len());
    indices.iter().copied().filter(|i| seen.insert(*i)).collect()
}
