//! Recording session state machine

use std::fmt;

use crate::domain::error::CaptureError;

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
}

impl SessionState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        }
    }

    /// Check if currently recording
    pub const fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// Transition from IDLE to RECORDING
    pub fn begin(&mut self) -> Result<(), CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::AlreadyRecording);
        }
        *self = Self::Recording;
        Ok(())
    }

    /// Transition from RECORDING to IDLE
    pub fn end(&mut self) -> Result<(), CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }
        *self = Self::Idle;
        Ok(())
    }

    /// Fail unless idle, without transitioning
    pub fn ensure_idle(&self) -> Result<(), CaptureError> {
        match self {
            Self::Idle => Ok(()),
            Self::Recording => Err(CaptureError::AlreadyRecording),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the session for status reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_recording: bool,
    /// Active device names in selection order
    pub devices: Vec<String>,
}
