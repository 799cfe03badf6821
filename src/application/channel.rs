//! Capture channel: one device's output file, writer thread and stream
//!
//! The backend callback only copies the buffer into a bounded queue. A
//! dedicated writer thread owns the file, appends queued buffers, counts
//! the bytes that reached it, and patches the header when the channel is
//! closed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use super::ports::{AudioBackend, CaptureStream, DataCallback, DeviceInfo, DeviceKind};
use crate::domain::audio::{patch_payload_size, write_header, AudioStreamDescriptor, WavHeader};
use crate::domain::error::CaptureError;

/// Buffers the callback may queue ahead of the writer thread
pub const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Counters {
    bytes_written: AtomicU64,
    dropped_buffers: AtomicU64,
    write_errors: AtomicU64,
}

/// Outcome of a finished writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterReport {
    pub payload_bytes: u64,
    pub dropped_buffers: u64,
    pub write_errors: u64,
}

/// Owns the writer thread of one output file
pub struct ChannelWriter {
    path: PathBuf,
    initial: AudioStreamDescriptor,
    data_tx: Sender<Vec<u8>>,
    finish_tx: Sender<AudioStreamDescriptor>,
    counters: Arc<Counters>,
    thread: Option<JoinHandle<io::Result<u64>>>,
}

impl ChannelWriter {
    /// Create `path`, write a placeholder header and start the writer thread.
    pub fn create(path: &Path, descriptor: AudioStreamDescriptor) -> Result<Self, CaptureError> {
        let create_failed = |e: io::Error| CaptureError::FileCreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut file = BufWriter::new(File::create(path).map_err(create_failed)?);
        write_header(&mut file, &WavHeader::placeholder(descriptor)).map_err(create_failed)?;

        let (data_tx, data_rx) = bounded::<Vec<u8>>(QUEUE_CAPACITY);
        let (finish_tx, finish_rx) = bounded::<AudioStreamDescriptor>(1);
        let counters = Arc::new(Counters::default());

        let task = WriterTask {
            path: path.to_path_buf(),
            file,
            initial: descriptor,
            written: 0,
            counters: Arc::clone(&counters),
        };
        let thread = thread::Builder::new()
            .name("multicap-writer".to_string())
            .spawn(move || task.run(data_rx, finish_rx))
            .map_err(create_failed)?;

        Ok(Self {
            path: path.to_path_buf(),
            initial: descriptor,
            data_tx,
            finish_tx,
            counters,
            thread: Some(thread),
        })
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Callback handing buffers to the writer thread.
    ///
    /// Never blocks: a buffer arriving while the queue is full is dropped
    /// and counted.
    pub fn callback(&self) -> DataCallback {
        let tx = self.data_tx.clone();
        let counters = Arc::clone(&self.counters);
        Box::new(move |bytes: &[u8]| {
            if bytes.is_empty() {
                return;
            }
            match tx.try_send(bytes.to_vec()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    counters.dropped_buffers.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        })
    }

    /// Payload bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.counters.bytes_written.load(Ordering::Relaxed)
    }

    /// Drain queued buffers, patch the header for `descriptor`, close the file.
    pub fn finish(mut self, descriptor: AudioStreamDescriptor) -> io::Result<WriterReport> {
        let payload_bytes = self.join(descriptor)?;
        Ok(WriterReport {
            payload_bytes,
            dropped_buffers: self.counters.dropped_buffers.load(Ordering::Relaxed),
            write_errors: self.counters.write_errors.load(Ordering::Relaxed),
        })
    }

    /// Finish and delete the file
    pub fn discard(mut self) {
        let initial = self.initial;
        if let Err(e) = self.join(initial) {
            debug!(path = %self.path.display(), error = %e, "writer failed while discarding");
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove discarded recording");
        }
    }

    fn join(&mut self, descriptor: AudioStreamDescriptor) -> io::Result<u64> {
        let Some(thread) = self.thread.take() else {
            return Ok(self.bytes_written());
        };
        // The writer only exits after this message or a panic
        let _ = self.finish_tx.send(descriptor);
        thread
            .join()
            .map_err(|_| io::Error::other("writer thread panicked"))?
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        let initial = self.initial;
        if let Err(e) = self.join(initial) {
            error!(path = %self.path.display(), error = %e, "failed to finalize recording");
        }
    }
}

struct WriterTask {
    path: PathBuf,
    file: BufWriter<File>,
    initial: AudioStreamDescriptor,
    written: u64,
    counters: Arc<Counters>,
}

impl WriterTask {
    fn run(
        mut self,
        data_rx: Receiver<Vec<u8>>,
        finish_rx: Receiver<AudioStreamDescriptor>,
    ) -> io::Result<u64> {
        let descriptor = loop {
            select! {
                recv(data_rx) -> msg => match msg {
                    Ok(buffer) => self.append(&buffer),
                    Err(_) => break finish_rx.recv().unwrap_or(self.initial),
                },
                recv(finish_rx) -> msg => {
                    for buffer in data_rx.try_iter() {
                        self.append(&buffer);
                    }
                    break msg.unwrap_or(self.initial);
                }
            }
        };
        self.finalize(descriptor)
    }

    fn append(&mut self, buffer: &[u8]) {
        let mut rest = buffer;
        while !rest.is_empty() {
            match self.file.write(rest) {
                Ok(0) => {
                    self.write_failed(&io::Error::from(io::ErrorKind::WriteZero));
                    return;
                }
                Ok(n) => {
                    self.written += n as u64;
                    self.counters
                        .bytes_written
                        .fetch_add(n as u64, Ordering::Relaxed);
                    rest = &rest[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.write_failed(&e);
                    return;
                }
            }
        }
    }

    fn write_failed(&self, e: &io::Error) {
        let failures = self.counters.write_errors.fetch_add(1, Ordering::Relaxed) + 1;
        // One line per failure would flood the log on a full disk
        if failures.is_power_of_two() {
            warn!(
                path = %self.path.display(),
                error = %e,
                failures,
                "failed to write audio buffer"
            );
        }
    }

    fn finalize(mut self, descriptor: AudioStreamDescriptor) -> io::Result<u64> {
        let payload_size =
            WavHeader::payload_size_for(descriptor, self.written).unwrap_or_else(|max| {
                warn!(
                    path = %self.path.display(),
                    bytes = self.written,
                    header_bytes = max,
                    "payload exceeds WAV size limit, header saturated"
                );
                max
            });

        patch_payload_size(&mut self.file, descriptor, payload_size)?;
        self.file.seek(io::SeekFrom::End(0))?;
        self.file.flush()?;
        self.file.get_ref().sync_all()?;

        debug!(path = %self.path.display(), bytes = self.written, "recording finalized");
        Ok(self.written)
    }
}

/// Summary of a channel that is recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChannel {
    pub device_name: String,
    pub kind: DeviceKind,
    pub path: PathBuf,
    pub descriptor: AudioStreamDescriptor,
}

/// Result of closing a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedRecording {
    pub device_name: String,
    pub path: PathBuf,
    pub descriptor: AudioStreamDescriptor,
    pub payload_bytes: u64,
    pub dropped_buffers: u64,
    /// False when the header could not be patched
    pub finalized: bool,
}

impl FinishedRecording {
    /// Playback length of the payload
    pub fn duration(&self) -> Duration {
        self.descriptor.duration_of(self.payload_bytes)
    }

    /// Size of the file on disk
    pub fn file_size(&self) -> u64 {
        crate::domain::audio::WAV_HEADER_SIZE as u64 + self.payload_bytes
    }
}

/// One device's in-flight recording
pub struct CaptureChannel {
    device: DeviceInfo,
    stream: Box<dyn CaptureStream>,
    writer: ChannelWriter,
}

impl CaptureChannel {
    /// Create the output file and open and start the device stream.
    ///
    /// Anything created here is removed again if a later step fails.
    pub fn open<B: AudioBackend + ?Sized>(
        backend: &B,
        device: DeviceInfo,
        path: &Path,
        requested: AudioStreamDescriptor,
    ) -> Result<Self, CaptureError> {
        let writer = ChannelWriter::create(path, requested)?;

        let mut stream = match backend.open_stream(&device, requested, writer.callback()) {
            Ok(stream) => stream,
            Err(e) => {
                writer.discard();
                return Err(e);
            }
        };

        if let Err(e) = stream.start() {
            stream.stop();
            drop(stream);
            writer.discard();
            return Err(e);
        }

        info!(
            device = %device.name,
            path = %path.display(),
            format = %stream.descriptor(),
            "channel recording"
        );

        Ok(Self {
            device,
            stream,
            writer,
        })
    }

    /// Device being recorded
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// Payload bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    pub fn summary(&self) -> ActiveChannel {
        ActiveChannel {
            device_name: self.device.name.clone(),
            kind: self.device.kind,
            path: self.writer.path().to_path_buf(),
            descriptor: self.stream.descriptor(),
        }
    }

    /// Stop the stream, then finalize the file with the final byte count.
    pub fn close(mut self) -> FinishedRecording {
        self.stream.stop();
        let descriptor = self.stream.descriptor();
        let path = self.writer.path().to_path_buf();
        let live_bytes = self.writer.bytes_written();

        let (payload_bytes, dropped_buffers, finalized) = match self.writer.finish(descriptor) {
            Ok(report) => {
                if report.dropped_buffers > 0 || report.write_errors > 0 {
                    warn!(
                        device = %self.device.name,
                        dropped = report.dropped_buffers,
                        write_errors = report.write_errors,
                        "recording lost audio"
                    );
                }
                (report.payload_bytes, report.dropped_buffers, true)
            }
            Err(e) => {
                error!(device = %self.device.name, error = %e, "failed to finalize recording");
                (live_bytes, 0, false)
            }
        };

        info!(device = %self.device.name, bytes = payload_bytes, "channel closed");

        FinishedRecording {
            device_name: self.device.name,
            path,
            descriptor,
            payload_bytes,
            dropped_buffers,
            finalized,
        }
    }

    /// Stop the stream and delete the output file
    pub fn discard(mut self) {
        self.stream.stop();
        self.writer.discard();
    }
}
