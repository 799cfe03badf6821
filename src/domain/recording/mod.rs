//! Recording file naming

pub mod filename;

pub use filename::{
    sanitize_device_name, session_timestamp, RecordingNamer, RECORDING_EXTENSION,
    SESSION_TIMESTAMP_FORMAT,
};
