use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned camera identity.
///
/// The backend hands ids out as either JSON strings or numbers; both are kept
/// as their decimal/string form so `"7"` and `7` name the same camera.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawCameraId", into = "String")]
pub struct CameraId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCameraId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawCameraId> for CameraId {
    fn from(raw: RawCameraId) -> Self {
        match raw {
            RawCameraId::Text(text) => CameraId(text),
            RawCameraId::Number(number) => CameraId(number.to_string()),
        }
    }
}

impl From<CameraId> for String {
    fn from(id: CameraId) -> Self {
        id.0
    }
}

impl CameraId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CameraId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CameraId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DEFAULT_ONVIF_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub id: CameraId,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_fake: bool,
}

impl Camera {
    /// Simulated cameras have no real stream behind them.
    pub fn has_stream(&self) -> bool {
        !self.is_fake
    }
}

/// Body of `POST /cameras`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCamera {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_fake: bool,
}

fn default_port() -> u16 {
    DEFAULT_ONVIF_PORT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraState {
    Unknown,
    Online,
    Partial,
    Offline,
    Error,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::Unknown
    }
}

impl CameraState {
    pub fn parse_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "online" | "connected" | "ok" => Self::Online,
            "partial" | "degraded" => Self::Partial,
            "offline" | "disconnected" | "unreachable" => Self::Offline,
            "error" | "failed" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Video encoder settings as reported by (or requested from) a camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub resolution: Option<Resolution>,
    pub fps: Option<f64>,
    pub bitrate: Option<u32>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraStatus {
    pub camera_id: CameraId,
    pub status: CameraState,
    pub current_config: Option<StreamConfig>,
    pub last_checked: DateTime<Utc>,
    pub error: Option<String>,
}

impl CameraStatus {
    pub fn unknown(camera_id: CameraId) -> Self {
        Self {
            camera_id,
            status: CameraState::Unknown,
            current_config: None,
            last_checked: Utc::now(),
            error: None,
        }
    }

    /// Status recorded when the check call itself failed.
    pub fn failed(camera_id: CameraId, error: impl Into<String>) -> Self {
        Self {
            camera_id,
            status: CameraState::Error,
            current_config: None,
            last_checked: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of a backend stream analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub camera_id: Option<CameraId>,
    pub is_valid: bool,
    pub expected_width: Option<u32>,
    pub expected_height: Option<u32>,
    #[serde(rename = "expectedFPS")]
    pub expected_fps: Option<f64>,
    pub expected_bitrate: Option<u32>,
    pub expected_encoding: Option<String>,
    pub actual_width: Option<u32>,
    pub actual_height: Option<u32>,
    #[serde(rename = "actualFPS")]
    pub actual_fps: Option<f64>,
    pub actual_bitrate: Option<u32>,
    pub actual_encoding: Option<String>,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn has_actual_values(&self) -> bool {
        self.actual_width.is_some()
            || self.actual_height.is_some()
            || self.actual_fps.is_some()
            || self.actual_bitrate.is_some()
            || self.actual_encoding.is_some()
    }
}

/// Body of `POST /apply-config` minus the target camera(s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
}

/// Target settings a stream validation compares against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub bitrate: Option<u32>,
    pub encoding: Option<String>,
}

impl From<ConfigRequest> for ExpectedConfig {
    fn from(request: ConfigRequest) -> Self {
        Self {
            width: Some(request.width),
            height: Some(request.height),
            fps: Some(f64::from(request.fps)),
            bitrate: request.bitrate,
            encoding: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn camera_id_accepts_strings_and_numbers() {
        let from_text: CameraId = serde_json::from_value(json!("42")).unwrap();
        let from_number: CameraId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(from_text, from_number);
        assert_eq!(serde_json::to_value(&from_number).unwrap(), json!("42"));
    }

    #[test]
    fn camera_serializes_camel_case() {
        let camera = Camera {
            id: CameraId::new("1"),
            ip: "10.0.0.5".into(),
            port: 80,
            username: Some("admin".into()),
            is_fake: true,
        };
        let value = serde_json::to_value(&camera).unwrap();
        assert_eq!(value["isFake"], true);
        assert_eq!(value["ip"], "10.0.0.5");
    }

    #[test]
    fn state_parsing_is_lenient() {
        assert_eq!(CameraState::parse_loose("ONLINE"), CameraState::Online);
        assert_eq!(CameraState::parse_loose("degraded"), CameraState::Partial);
        assert_eq!(CameraState::parse_loose("what"), CameraState::Unknown);
    }

    #[test]
    fn config_request_becomes_expected_config() {
        let expected = ExpectedConfig::from(ConfigRequest {
            width: 1920,
            height: 1080,
            fps: 30,
            bitrate: None,
        });
        assert_eq!(expected.width, Some(1920));
        assert_eq!(expected.fps, Some(30.0));
        assert_eq!(expected.encoding, None);
    }
}
