//! Application layer - Use cases and port interfaces
//!
//! The capture session, its per-device channel writers, the recordings
//! library, and the traits infrastructure adapters implement.

pub mod capture;
pub mod channel;
pub mod library;
pub mod ports;

pub use capture::CaptureService;
pub use channel::{ActiveChannel, FinishedRecording, WriterReport};
pub use library::{LibraryError, RecordingEntry, RecordingLibrary};
