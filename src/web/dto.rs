//! JSON request and response bodies

use serde::{Deserialize, Serialize};

use crate::application::ports::{DeviceInfo, DeviceKind};
use crate::application::{ActiveChannel, FinishedRecording, RecordingEntry};
use crate::domain::session::SessionStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDto {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

impl From<DeviceInfo> for DeviceDto {
    fn from(device: DeviceInfo) -> Self {
        Self {
            index: device.index,
            name: device.name,
            kind: device.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub is_recording: bool,
    pub devices: Vec<String>,
}

impl From<SessionStatus> for StatusDto {
    fn from(status: SessionStatus) -> Self {
        Self {
            is_recording: status.is_recording,
            devices: status.devices,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub device_indices: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartResponse {
    pub status: String,
    /// File names opened for this session
    pub files: Vec<String>,
}

impl StartResponse {
    pub fn new(channels: &[ActiveChannel]) -> Self {
        Self {
            status: "recording started".to_string(),
            files: channels.iter().map(|c| file_name(&c.path)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedFileDto {
    pub name: String,
    pub device: String,
    pub size: u64,
    pub duration_secs: f64,
    pub dropped_buffers: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StopResponse {
    pub status: String,
    pub files: Vec<SavedFileDto>,
}

impl StopResponse {
    pub fn new(recordings: &[FinishedRecording]) -> Self {
        Self {
            status: "recording stopped".to_string(),
            files: recordings
                .iter()
                .map(|r| SavedFileDto {
                    name: file_name(&r.path),
                    device: r.device_name.clone(),
                    size: r.file_size(),
                    duration_secs: r.duration().as_secs_f64(),
                    dropped_buffers: r.dropped_buffers,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingDto {
    pub name: String,
    pub size: u64,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration: Option<f64>,
}

impl From<RecordingEntry> for RecordingDto {
    fn from(entry: RecordingEntry) -> Self {
        Self {
            name: entry.name,
            size: entry.size,
            time: entry.time,
            duration: entry.duration.map(|d| d.as_secs_f64()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_uses_camel_case() {
        let dto = StatusDto {
            is_recording: true,
            devices: vec!["Mic".to_string()],
        };
        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({"isRecording": true, "devices": ["Mic"]})
        );
    }

    #[test]
    fn device_carries_type() {
        let dto = DeviceDto {
            index: 2,
            name: "Speakers".to_string(),
            kind: DeviceKind::Loopback,
        };
        assert_eq!(
            serde_json::to_value(dto).unwrap(),
            json!({"index": 2, "name": "Speakers", "type": "loopback"})
        );
    }

    #[test]
    fn start_request_reads_device_indices() {
        let req: StartRequest = serde_json::from_str(r#"{"deviceIndices":[0,2]}"#).unwrap();
        assert_eq!(req.device_indices, vec![0, 2]);
    }

    #[test]
    fn recording_omits_unknown_duration() {
        let dto = RecordingDto {
            name: "a.wav".to_string(),
            size: 44,
            time: "2024-03-09 14:05:07".to_string(),
            duration: None,
        };
        let value = serde_json::to_value(dto).unwrap();
        assert!(value.get("duration").is_none());
    }
}
