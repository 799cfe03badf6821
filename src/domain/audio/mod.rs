//! Audio format value objects and the WAV header codec

pub mod descriptor;
pub mod wav_header;

pub use descriptor::AudioStreamDescriptor;
pub use wav_header::{
    patch_payload_size, write_header, HeaderError, WavHeader, WAV_HEADER_SIZE,
};
