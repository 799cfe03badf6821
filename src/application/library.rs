//! Recordings library
//!
//! Read-only view over the output directory used by the HTTP listing and
//! download routes.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::domain::audio::{WavHeader, WAV_HEADER_SIZE};
use crate::domain::recording::RECORDING_EXTENSION;

/// Listing timestamp format
pub const LISTING_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Invalid recording name: {0}")]
    InvalidName(String),

    #[error("Recording not found: {0}")]
    NotFound(String),

    #[error("Failed to read recordings: {0}")]
    Io(#[from] io::Error),
}

/// One file in the recordings directory
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingEntry {
    pub name: String,
    pub size: u64,
    /// Modification time, local, `%Y-%m-%d %H:%M:%S`
    pub time: String,
    /// Length of the payload per the header, if the header is complete
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct RecordingLibrary {
    directory: PathBuf,
}

impl RecordingLibrary {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// All recordings sorted by name. A missing directory lists as empty.
    pub async fn list(&self) -> Result<Vec<RecordingEntry>, LibraryError> {
        let mut dir = match fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !is_recording(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let time = metadata
                .modified()
                .map(|t| DateTime::<Local>::from(t).format(LISTING_TIME_FORMAT).to_string())
                .unwrap_or_default();

            entries.push(RecordingEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                time,
                duration: read_duration(&path).await,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Path of the recording called `name`, refusing anything that could
    /// escape the directory.
    pub async fn resolve(&self, name: &str) -> Result<PathBuf, LibraryError> {
        validate_name(name)?;

        let path = self.directory.join(name);
        match fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(path),
            Ok(_) => Err(LibraryError::NotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LibraryError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn is_recording(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(RECORDING_EXTENSION))
}

fn validate_name(name: &str) -> Result<(), LibraryError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();

    if invalid {
        return Err(LibraryError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Duration from the header; `None` for short or placeholder headers
async fn read_duration(path: &Path) -> Option<Duration> {
    let mut file = fs::File::open(path).await.ok()?;
    let mut buf = [0u8; WAV_HEADER_SIZE];
    file.read_exact(&mut buf).await.ok()?;

    match WavHeader::decode(&buf) {
        Ok(header) if header.payload_size > 0 => {
            Some(header.descriptor.duration_of(header.payload_size as u64))
        }
        Ok(_) => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable header");
            None
        }
    }
}
