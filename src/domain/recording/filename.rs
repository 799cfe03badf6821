//! Output file naming for capture channels

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Local};

/// Extension of every recording
pub const RECORDING_EXTENSION: &str = "wav";

/// Timestamp format shared by all files of one session
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Replace every character outside `[A-Za-z0-9-]` with `_`.
pub fn sanitize_device_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Format a session start time for file names
pub fn session_timestamp(started_at: &DateTime<Local>) -> String {
    started_at.format(SESSION_TIMESTAMP_FORMAT).to_string()
}

/// Derives unique recording paths for the channels of one session.
///
/// Names follow `<timestamp>_<sanitized device name>.wav`. Devices whose
/// names sanitize to the same stem, or stems whose file already exists,
/// get a `_2`, `_3`, ... suffix.
#[derive(Debug)]
pub struct RecordingNamer {
    directory: PathBuf,
    timestamp: String,
    taken: HashSet<String>,
}

impl RecordingNamer {
    pub fn new(directory: impl Into<PathBuf>, started_at: &DateTime<Local>) -> Self {
        Self {
            directory: directory.into(),
            timestamp: session_timestamp(started_at),
            taken: HashSet::new(),
        }
    }

    /// Next free path for `device_name`
    pub fn path_for(&mut self, device_name: &str) -> PathBuf {
        let stem = format!("{}_{}", self.timestamp, sanitize_device_name(device_name));

        let mut attempt = 1;
        loop {
            let file_name = if attempt == 1 {
                format!("{}.{}", stem, RECORDING_EXTENSION)
            } else {
                format!("{}_{}.{}", stem, attempt, RECORDING_EXTENSION)
            };
            let path = self.directory.join(&file_name);
            if !self.taken.contains(&file_name) && !path.exists() {
                self.taken.insert(file_name);
                return path;
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn sanitize_replaces_specials() {
        assert_eq!(sanitize_device_name("BlackHole 2ch!"), "BlackHole_2ch_");
    }

    #[test]
    fn sanitize_keeps_dash_and_alnum() {
        assert_eq!(sanitize_device_name("USB-Mic-01"), "USB-Mic-01");
    }

    #[test]
    fn sanitize_maps_each_char_once() {
        assert_eq!(sanitize_device_name("Mic (Rød)"), "Mic__R_d_");
        assert_eq!(sanitize_device_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn timestamp_format() {
        assert_eq!(session_timestamp(&start_time()), "2024-03-09_14-05-07");
    }

    #[test]
    fn path_uses_timestamp_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut namer = RecordingNamer::new(dir.path(), &start_time());
        let path = namer.path_for("BlackHole 2ch!");
        assert_eq!(
            path,
            dir.path().join("2024-03-09_14-05-07_BlackHole_2ch_.wav")
        );
    }

    #[test]
    fn colliding_names_get_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let mut namer = RecordingNamer::new(dir.path(), &start_time());
        let first = namer.path_for("USB Audio");
        let second = namer.path_for("USB:Audio");
        assert_ne!(first, second);
        assert!(second
            .to_string_lossy()
            .ends_with("2024-03-09_14-05-07_USB_Audio_2.wav"));
    }

    #[test]
    fn existing_file_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2024-03-09_14-05-07_Mic.wav"), b"x").unwrap();
        let mut namer = RecordingNamer::new(dir.path(), &start_time());
        let path = namer.path_for("Mic");
        assert_eq!(path, dir.path().join("2024-03-09_14-05-07_Mic_2.wav"));
    }
}
