//! In-memory audio backend
//!
//! Stands in for the native backend where no hardware is available.
//! Buffers are pushed with [`SimulatedBackend::feed`], which invokes the
//! stream's data callback the way a backend audio thread would.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::application::ports::{
    AudioBackend, CaptureStream, DataCallback, DeviceInfo, DeviceKind,
};
use crate::domain::audio::AudioStreamDescriptor;
use crate::domain::error::CaptureError;

#[derive(Default)]
struct StreamSlot {
    callback: Option<DataCallback>,
    running: bool,
}

#[derive(Default)]
struct Inner {
    devices: Vec<(String, DeviceKind)>,
    fail_enumeration: bool,
    fail_open: HashSet<String>,
    fail_start: HashSet<String>,
    delivered_rate: Option<u32>,
    open_delay: Option<Duration>,
    streams: HashMap<usize, Arc<Mutex<StreamSlot>>>,
}

/// Scriptable backend with failure injection
#[derive(Clone, Default)]
pub struct SimulatedBackend {
    inner: Arc<Mutex<Inner>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl SimulatedBackend {
    /// Backend without devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the given capture devices, in enumeration order
    pub fn with_devices<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let backend = Self::new();
        backend.set_devices(names);
        backend
    }

    /// Replace the capture device list
    pub fn set_devices<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.inner).devices = names
            .into_iter()
            .map(|n| (n.into(), DeviceKind::Capture))
            .collect();
    }

    /// Append a loopback source
    pub fn add_loopback(&self, name: impl Into<String>) {
        lock(&self.inner)
            .devices
            .push((name.into(), DeviceKind::Loopback));
    }

    /// Make enumeration fail
    pub fn fail_enumeration(&self) {
        lock(&self.inner).fail_enumeration = true;
    }

    /// Make opening a stream on `name` fail
    pub fn fail_open(&self, name: impl Into<String>) {
        lock(&self.inner).fail_open.insert(name.into());
    }

    /// Make starting a stream on `name` fail
    pub fn fail_start(&self, name: impl Into<String>) {
        lock(&self.inner).fail_start.insert(name.into());
    }

    /// Deliver at `rate` instead of the requested sample rate
    pub fn deliver_sample_rate(&self, rate: u32) {
        lock(&self.inner).delivered_rate = Some(rate);
    }

    /// Take `delay` to open every stream, like a device that is slow to settle
    pub fn delay_open(&self, delay: Duration) {
        lock(&self.inner).open_delay = Some(delay);
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        lock(&self.inner).devices.iter().position(|(n, _)| n == name)
    }

    fn slot(&self, index: usize) -> Option<Arc<Mutex<StreamSlot>>> {
        lock(&self.inner).streams.get(&index).cloned()
    }

    /// Push one buffer from the device called `name`.
    ///
    /// Returns false when that device has no running stream.
    pub fn feed(&self, name: &str, bytes: &[u8]) -> bool {
        let Some(slot) = self.index_of(name).and_then(|i| self.slot(i)) else {
            return false;
        };
        let mut slot = lock(&slot);
        if !slot.running {
            return false;
        }
        match slot.callback.as_mut() {
            Some(callback) => {
                callback(bytes);
                true
            }
            None => false,
        }
    }

    /// Whether the device called `name` has a running stream
    pub fn is_running(&self, name: &str) -> bool {
        self.index_of(name)
            .and_then(|i| self.slot(i))
            .map(|slot| lock(&slot).running)
            .unwrap_or(false)
    }
}

impl AudioBackend for SimulatedBackend {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let inner = lock(&self.inner);
        if inner.fail_enumeration {
            return Err(CaptureError::DeviceEnumerationFailed(
                "simulated enumeration failure".to_string(),
            ));
        }
        Ok(inner
            .devices
            .iter()
            .enumerate()
            .map(|(index, (name, kind))| DeviceInfo {
                index,
                name: name.clone(),
                kind: *kind,
            })
            .collect())
    }

    fn open_stream(
        &self,
        device: &DeviceInfo,
        requested: AudioStreamDescriptor,
        on_data: DataCallback,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let delay = lock(&self.inner).open_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut inner = lock(&self.inner);

        let current = inner.devices.get(device.index).map(|(n, _)| n.as_str());
        if current != Some(device.name.as_str()) {
            return Err(CaptureError::StreamInitFailed {
                device: device.name.clone(),
                reason: "device list changed since enumeration".to_string(),
            });
        }
        if inner.fail_open.contains(&device.name) {
            return Err(CaptureError::StreamInitFailed {
                device: device.name.clone(),
                reason: "simulated init failure".to_string(),
            });
        }

        let slot = Arc::new(Mutex::new(StreamSlot {
            callback: Some(on_data),
            running: false,
        }));
        inner.streams.insert(device.index, Arc::clone(&slot));

        let descriptor = match inner.delivered_rate {
            Some(rate) => requested.with_sample_rate(rate),
            None => requested,
        };

        Ok(Box::new(SimulatedStream {
            device: device.name.clone(),
            descriptor,
            fail_start: inner.fail_start.contains(&device.name),
            slot,
        }))
    }
}

struct SimulatedStream {
    device: String,
    descriptor: AudioStreamDescriptor,
    fail_start: bool,
    slot: Arc<Mutex<StreamSlot>>,
}

impl CaptureStream for SimulatedStream {
    fn descriptor(&self) -> AudioStreamDescriptor {
        self.descriptor
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        if self.fail_start {
            return Err(CaptureError::StreamStartFailed {
                device: self.device.clone(),
                reason: "simulated start failure".to_string(),
            });
        }
        lock(&self.slot).running = true;
        Ok(())
    }

    fn stop(&mut self) {
        let mut slot = lock(&self.slot);
        slot.running = false;
        slot.callback = None;
    }
}

impl Drop for SimulatedStream {
    fn drop(&mut self) {
        self.stop();
    }
}
