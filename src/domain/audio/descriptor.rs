//! Audio stream descriptor value object

use std::fmt;

/// Immutable format parameters of one captured stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioStreamDescriptor {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioStreamDescriptor {
    /// Format every capture channel requests: mono, 16-bit, 44.1kHz.
    pub const CAPTURE: Self = Self {
        sample_rate: 44_100,
        channels: 1,
        bits_per_sample: 16,
    };

    /// Create a descriptor.
    pub const fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Same format at a different sample rate
    pub const fn with_sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }

    /// Bytes per second of payload
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// Bytes per frame (one sample for every channel)
    pub const fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Playback duration of `payload_bytes` of audio in this format
    pub fn duration_of(&self, payload_bytes: u64) -> std::time::Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(payload_bytes as f64 / byte_rate as f64)
    }
}

impl Default for AudioStreamDescriptor {
    fn default() -> Self {
        Self::CAPTURE
    }
}

impl fmt::Display for AudioStreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = if self.channels == 1 { "mono" } else { "multichannel" };
        write!(
            f,
            "{} Hz, {}-bit, {}",
            self.sample_rate, self.bits_per_sample, layout
        )
    }
}
