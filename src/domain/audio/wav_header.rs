//! Fixed 44-byte RIFF/WAVE header for linear PCM
//!
//! Layout (little-endian):
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + payload_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16
//! [20-21]  1 (linear PCM)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate
//! [32-33]  block_align
//! [34-35]  bits_per_sample
//! [36-39]  "data"
//! [40-43]  payload_size
//! ```
//!
//! Recordings are created with a placeholder header (payload size 0) and
//! patched once the final byte count is known. A file still carrying
//! payload size 0 after the process exited was not finalized.

use std::io::{self, Seek, SeekFrom, Write};

use thiserror::Error;

use super::AudioStreamDescriptor;

/// Size of the header in bytes
pub const WAV_HEADER_SIZE: usize = 44;

const RIFF: &[u8; 4] = b"RIFF";
const WAVE: &[u8; 4] = b"WAVE";
const FMT: &[u8; 4] = b"fmt ";
const DATA: &[u8; 4] = b"data";
const FMT_CHUNK_SIZE: u32 = 16;
const FORMAT_PCM: u16 = 1;
/// Bytes counted by the RIFF size field ahead of the payload
const RIFF_OVERHEAD: u32 = 36;

/// Error when bytes do not hold a header this codec produces
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("Header too short: {0} bytes, need {WAV_HEADER_SIZE}")]
    TooShort(usize),

    #[error("Missing {0:?} marker")]
    BadMarker(&'static str),

    #[error("Unsupported format chunk (length {length}, codec {codec})")]
    UnsupportedFormat { length: u32, codec: u16 },

    #[error("Inconsistent header field: {0}")]
    Inconsistent(&'static str),
}

/// Decoded header contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub descriptor: AudioStreamDescriptor,
    pub payload_size: u32,
}

impl WavHeader {
    pub const fn new(descriptor: AudioStreamDescriptor, payload_size: u32) -> Self {
        Self {
            descriptor,
            payload_size,
        }
    }

    /// Header written when a recording is created
    pub const fn placeholder(descriptor: AudioStreamDescriptor) -> Self {
        Self::new(descriptor, 0)
    }

    /// Largest payload whose RIFF size still fits in 32 bits, in whole frames
    pub const fn max_payload_size(descriptor: AudioStreamDescriptor) -> u32 {
        let limit = u32::MAX - RIFF_OVERHEAD;
        let align = descriptor.block_align() as u32;
        if align == 0 {
            limit
        } else {
            limit - limit % align
        }
    }

    /// Payload size field for `bytes` written. `Err` carries the clamped
    /// value when `bytes` exceeds [`max_payload_size`](Self::max_payload_size).
    pub fn payload_size_for(descriptor: AudioStreamDescriptor, bytes: u64) -> Result<u32, u32> {
        let max = Self::max_payload_size(descriptor);
        match u32::try_from(bytes) {
            Ok(size) if size <= max => Ok(size),
            _ => Err(max),
        }
    }

    /// Value of the RIFF size field
    pub const fn riff_size(&self) -> u32 {
        RIFF_OVERHEAD.saturating_add(self.payload_size)
    }

    /// Size of the whole file this header describes
    pub const fn total_size(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.payload_size as u64
    }

    /// Serialize to the fixed layout.
    ///
    /// Callers keep `sample_rate > 0`, `channels > 0` and `bits_per_sample`
    /// in {8, 16, 24, 32}; nothing is checked here.
    pub fn encode(&self) -> [u8; WAV_HEADER_SIZE] {
        let d = &self.descriptor;
        let mut header = [0u8; WAV_HEADER_SIZE];

        header[0..4].copy_from_slice(RIFF);
        header[4..8].copy_from_slice(&self.riff_size().to_le_bytes());
        header[8..12].copy_from_slice(WAVE);

        header[12..16].copy_from_slice(FMT);
        header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
        header[22..24].copy_from_slice(&d.channels.to_le_bytes());
        header[24..28].copy_from_slice(&d.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&d.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&d.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&d.bits_per_sample.to_le_bytes());

        header[36..40].copy_from_slice(DATA);
        header[40..44].copy_from_slice(&self.payload_size.to_le_bytes());

        header
    }

    /// Parse the first 44 bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(HeaderError::TooShort(bytes.len()));
        }

        if &bytes[0..4] != RIFF {
            return Err(HeaderError::BadMarker("RIFF"));
        }
        if &bytes[8..12] != WAVE {
            return Err(HeaderError::BadMarker("WAVE"));
        }
        if &bytes[12..16] != FMT {
            return Err(HeaderError::BadMarker("fmt "));
        }
        if &bytes[36..40] != DATA {
            return Err(HeaderError::BadMarker("data"));
        }

        let length = read_u32(bytes, 16);
        let codec = read_u16(bytes, 20);
        if length != FMT_CHUNK_SIZE || codec != FORMAT_PCM {
            return Err(HeaderError::UnsupportedFormat { length, codec });
        }

        let descriptor = AudioStreamDescriptor {
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            bits_per_sample: read_u16(bytes, 34),
        };
        if read_u32(bytes, 28) != descriptor.byte_rate() {
            return Err(HeaderError::Inconsistent("byte rate"));
        }
        if read_u16(bytes, 32) != descriptor.block_align() {
            return Err(HeaderError::Inconsistent("block align"));
        }

        let header = Self::new(descriptor, read_u32(bytes, 40));
        if read_u32(bytes, 4) != header.riff_size() {
            return Err(HeaderError::Inconsistent("RIFF size"));
        }

        Ok(header)
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Append an encoded header at the sink's current position.
pub fn write_header<W: Write>(sink: &mut W, header: &WavHeader) -> io::Result<()> {
    sink.write_all(&header.encode())
}

/// Rewrite the header at offset 0 with the final payload size.
///
/// Leaves the sink positioned at byte 44, so payload already following the
/// header is untouched. Call once, after the last payload byte is written.
pub fn patch_payload_size<W: Write + Seek>(
    sink: &mut W,
    descriptor: AudioStreamDescriptor,
    payload_size: u32,
) -> io::Result<()> {
    sink.seek(SeekFrom::Start(0))?;
    write_header(sink, &WavHeader::new(descriptor, payload_size))
}
