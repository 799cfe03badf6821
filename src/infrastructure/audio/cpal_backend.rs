//! Native audio backend using cpal
//!
//! cpal streams are not `Send`, so every stream lives on its own thread
//! that builds it, plays it on request and drops it on stop. The session
//! only holds a command channel to that thread.

use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::application::ports::{
    AudioBackend, CaptureStream, DataCallback, DeviceInfo, DeviceKind,
};
use crate::domain::audio::AudioStreamDescriptor;
use crate::domain::error::CaptureError;

/// Audio backend over the platform's default cpal host
pub struct CpalBackend {
    host_id: cpal::HostId,
}

impl CpalBackend {
    /// Initialize the default host
    pub fn new() -> Result<Self, CaptureError> {
        let host_id = cpal::default_host().id();
        // Fails when the platform audio service is unavailable
        cpal::host_from_id(host_id)
            .map_err(|e| CaptureError::BackendInitFailed(e.to_string()))?;
        Ok(Self { host_id })
    }

    fn host(&self) -> Result<cpal::Host, CaptureError> {
        cpal::host_from_id(self.host_id).map_err(|e| CaptureError::BackendInitFailed(e.to_string()))
    }
}

impl AudioBackend for CpalBackend {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        Ok(enumerate(&self.host()?)?
            .into_iter()
            .map(|(info, _)| info)
            .collect())
    }

    fn open_stream(
        &self,
        device: &DeviceInfo,
        requested: AudioStreamDescriptor,
        on_data: DataCallback,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let host_id = self.host_id;
        let target = device.clone();
        let (ready_tx, ready_rx) = bounded(1);
        let (command_tx, command_rx) = unbounded();

        let thread = thread::Builder::new()
            .name(format!("multicap-stream-{}", device.index))
            .spawn(move || stream_thread(host_id, target, requested, on_data, ready_tx, command_rx))
            .map_err(|e| init_failed(device, e))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(init_failed(device, "stream thread exited")));

        match ready {
            Ok(descriptor) => Ok(Box::new(CpalStream {
                device: device.name.clone(),
                descriptor,
                commands: command_tx,
                thread: Some(thread),
            })),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }
}

fn init_failed(device: &DeviceInfo, reason: impl ToString) -> CaptureError {
    CaptureError::StreamInitFailed {
        device: device.name.clone(),
        reason: reason.to_string(),
    }
}

/// Capture devices, then (Windows) output devices as loopback sources
fn enumerate(host: &cpal::Host) -> Result<Vec<(DeviceInfo, cpal::Device)>, CaptureError> {
    let enumeration_failed =
        |e: cpal::DevicesError| CaptureError::DeviceEnumerationFailed(e.to_string());
    let mut devices = Vec::new();

    for device in host.input_devices().map_err(enumeration_failed)? {
        push_device(&mut devices, device, DeviceKind::Capture);
    }

    #[cfg(windows)]
    for device in host.output_devices().map_err(enumeration_failed)? {
        push_device(&mut devices, device, DeviceKind::Loopback);
    }

    Ok(devices)
}

fn push_device(
    devices: &mut Vec<(DeviceInfo, cpal::Device)>,
    device: cpal::Device,
    kind: DeviceKind,
) {
    let index = devices.len();
    let name = device
        .name()
        .unwrap_or_else(|_| format!("Unknown device {}", index));
    devices.push((DeviceInfo { index, name, kind }, device));
}

/// Re-enumerate and check the device is still where it was listed
fn resolve(host: &cpal::Host, target: &DeviceInfo) -> Result<cpal::Device, CaptureError> {
    enumerate(host)?
        .into_iter()
        .nth(target.index)
        .filter(|(info, _)| info.name == target.name && info.kind == target.kind)
        .map(|(_, device)| device)
        .ok_or_else(|| init_failed(target, "device list changed since enumeration"))
}

enum Command {
    Start(Sender<Result<(), String>>),
    Stop,
}

fn stream_thread(
    host_id: cpal::HostId,
    target: DeviceInfo,
    requested: AudioStreamDescriptor,
    on_data: DataCallback,
    ready: Sender<Result<AudioStreamDescriptor, CaptureError>>,
    commands: Receiver<Command>,
) {
    let built = cpal::host_from_id(host_id)
        .map_err(|e| CaptureError::BackendInitFailed(e.to_string()))
        .and_then(|host| resolve(&host, &target))
        .and_then(|device| build_stream(&device, &target, requested, on_data));

    let stream = match built {
        Ok((stream, descriptor)) => {
            let _ = ready.send(Ok(descriptor));
            stream
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    for command in commands {
        match command {
            Command::Start(reply) => {
                let _ = reply.send(stream.play().map_err(|e| e.to_string()));
            }
            Command::Stop => break,
        }
    }

    if let Err(e) = stream.pause() {
        debug!(device = %target.name, error = %e, "pause before close failed");
    }
    drop(stream);
    debug!(device = %target.name, "stream closed");
}

/// Pick a stream config for `requested`.
///
/// Prefers a range containing the requested rate with the fewest channels,
/// I16 over F32; falls back to the device default.
fn negotiate(
    device: &cpal::Device,
    target: &DeviceInfo,
    requested: AudioStreamDescriptor,
) -> Result<SupportedStreamConfig, CaptureError> {
    if target.kind == DeviceKind::Loopback {
        return device.default_output_config().map_err(|e| init_failed(target, e));
    }

    let rate = requested.sample_rate;
    let best = device
        .supported_input_configs()
        .map_err(|e| init_failed(target, e))?
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .filter(|c| c.min_sample_rate().0 <= rate && c.max_sample_rate().0 >= rate)
        .min_by_key(|c| (c.channels(), c.sample_format() != SampleFormat::I16));

    match best {
        Some(range) => Ok(range.with_sample_rate(SampleRate(rate))),
        None => device.default_input_config().map_err(|e| init_failed(target, e)),
    }
}

fn build_stream(
    device: &cpal::Device,
    target: &DeviceInfo,
    requested: AudioStreamDescriptor,
    mut on_data: DataCallback,
) -> Result<(cpal::Stream, AudioStreamDescriptor), CaptureError> {
    let supported = negotiate(device, target, requested)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();
    let channels = config.channels;
    let descriptor = requested.with_sample_rate(config.sample_rate.0);

    if descriptor != requested {
        warn!(
            device = %target.name,
            requested = %requested,
            delivered = %descriptor,
            "device does not support the requested sample rate"
        );
    }

    let name = target.name.clone();
    let on_error = move |err: cpal::StreamError| {
        warn!(device = %name, error = %err, "audio stream error");
    };

    let mut scratch = Vec::new();
    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                encode_mono_pcm16(data, channels, |s| s, &mut scratch);
                on_data(&scratch);
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                encode_mono_pcm16(data, channels, f32_to_i16, &mut scratch);
                on_data(&scratch);
            },
            on_error,
            None,
        ),
        other => {
            return Err(init_failed(
                target,
                format!("unsupported sample format {:?}", other),
            ))
        }
    }
    .map_err(|e| init_failed(target, e))?;

    Ok((stream, descriptor))
}

/// Average interleaved frames to mono and encode as little-endian i16.
///
/// `out` is reused between callbacks to avoid allocating per buffer.
pub(crate) fn encode_mono_pcm16<S: Copy>(
    data: &[S],
    channels: u16,
    to_i16: impl Fn(S) -> i16,
    out: &mut Vec<u8>,
) {
    let channels = channels.max(1) as usize;
    out.clear();
    out.reserve(data.len() / channels * 2);

    if channels == 1 {
        for &s in data {
            out.extend_from_slice(&to_i16(s).to_le_bytes());
        }
        return;
    }

    for frame in data.chunks(channels) {
        let sum: i32 = frame.iter().map(|&s| to_i16(s) as i32).sum();
        let mono = (sum / frame.len() as i32) as i16;
        out.extend_from_slice(&mono.to_le_bytes());
    }
}

pub(crate) fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

struct CpalStream {
    device: String,
    descriptor: AudioStreamDescriptor,
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream for CpalStream {
    fn descriptor(&self) -> AudioStreamDescriptor {
        self.descriptor
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let start_failed = |reason: String| CaptureError::StreamStartFailed {
            device: self.device.clone(),
            reason,
        };
        let (reply_tx, reply_rx) = bounded(1);
        self.commands
            .send(Command::Start(reply_tx))
            .map_err(|_| start_failed("stream thread exited".to_string()))?;
        reply_rx
            .recv()
            .map_err(|_| start_failed("stream thread exited".to_string()))?
            .map_err(start_failed)
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.commands.send(Command::Stop);
        if thread.join().is_err() {
            warn!(device = %self.device, "stream thread panicked");
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.stop();
    }
}
