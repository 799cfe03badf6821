//! CLI presenter for output formatting

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ports::{DeviceInfo, DeviceKind};
use crate::application::FinishedRecording;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Prompt on stderr without a newline
    pub fn prompt(&self, text: &str) {
        eprint!("{} ", text.bold());
        let _ = io::stderr().flush();
    }

    /// Print the device table to stdout
    pub fn device_list(&self, devices: &[DeviceInfo]) {
        for device in devices {
            self.output(&format_device_line(device));
        }
    }

    /// One line per finished file
    pub fn saved(&self, recording: &FinishedRecording) {
        let line = format!(
            "Saved {} ({}, {})",
            recording.path.display(),
            format_bytes(recording.file_size()),
            format_elapsed(recording.duration())
        );
        if recording.finalized {
            self.success(&line);
        } else {
            self.warn(&format!("{} - header not finalized", line));
        }
        if recording.dropped_buffers > 0 {
            self.warn(&format!(
                "{}: {} buffers dropped while the disk was busy",
                recording.device_name, recording.dropped_buffers
            ));
        }
    }

    /// Spinner message while recording
    pub fn update_recording_progress(&self, elapsed: Duration, bytes: u64) {
        self.update_spinner(&format_recording_progress(elapsed, bytes));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Announce a file being written
    pub fn recording_to(&self, device: &str, path: &Path) {
        eprintln!("  {} {} → {}", "●".red(), device, path.display());
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_device_line(device: &DeviceInfo) -> String {
    match device.kind {
        DeviceKind::Capture => format!("[{}] {}", device.index, device.name),
        DeviceKind::Loopback => format!("[{}] {} (loopback)", device.index, device.name),
    }
}

/// `1.4 MB`, `512 B`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

pub fn format_recording_progress(elapsed: Duration, bytes: u64) -> String {
    format!(
        "Recording... {} ({}) - press Enter to stop",
        format_elapsed(elapsed).cyan(),
        format_bytes(bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_formatting() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_secs(5)), "00:05");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "02:05");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1:02:05");
    }

    #[test]
    fn device_lines() {
        let mic = DeviceInfo {
            index: 0,
            name: "Mic".to_string(),
            kind: DeviceKind::Capture,
        };
        let speakers = DeviceInfo {
            index: 3,
            name: "Speakers".to_string(),
            kind: DeviceKind::Loopback,
        };
        assert_eq!(format_device_line(&mic), "[0] Mic");
        assert_eq!(format_device_line(&speakers), "[3] Speakers (loopback)");
    }

    #[test]
    fn progress_mentions_size() {
        let line = format_recording_progress(Duration::from_secs(65), 2048);
        assert!(line.contains("01:05"));
        assert!(line.contains("2.0 KB"));
    }
}
