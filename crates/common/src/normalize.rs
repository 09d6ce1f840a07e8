//! Mapping of backend payloads onto the canonical camera types.
//!
//! The backend is not consistent about casing or nesting. Encoder settings
//! arrive as ONVIF-style `Resolution.Width` / `RateControl.FrameRateLimit`,
//! as flat `Width` / `FrameRateLimit`, or as camelCase `width` / `fps`; ids
//! come back as strings or numbers. Everything read from the backend goes
//! through this module exactly once.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::cameras::{
    Camera, CameraId, CameraState, CameraStatus, DeviceInfo, Resolution, StreamConfig,
    ValidationResult, DEFAULT_ONVIF_PORT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("expected a JSON object for {0}")]
    NotAnObject(&'static str),

    #[error("expected a JSON array for {0}")]
    NotAnArray(&'static str),

    #[error("missing field `{field}` in {context}")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
}

const WIDTH_KEYS: &[&str] = &["width", "Width"];
const HEIGHT_KEYS: &[&str] = &["height", "Height"];
const FPS_KEYS: &[&str] = &["fps", "FPS", "frameRate", "framerate", "FrameRateLimit", "frameRateLimit"];
const BITRATE_KEYS: &[&str] = &["bitrate", "bitRate", "Bitrate", "BitrateLimit", "bitrateLimit"];
const ENCODING_KEYS: &[&str] = &["encoding", "Encoding", "codec", "Codec"];

/// First present, non-null member among `keys`.
fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|v| !v.is_null())
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(|f| {
            if f >= 0.0 && f <= f64::from(u32::MAX) {
                Some(f.round() as u32)
            } else {
                None
            }
        }),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_u64().map(|v| v != 0),
        _ => None,
    }
}

fn camera_id(value: &Value) -> Option<CameraId> {
    as_string(value).map(CameraId::new)
}

pub fn camera(value: &Value) -> Result<Camera, NormalizeError> {
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject("camera"));
    }
    let id = field(value, &["id", "_id", "cameraId", "camera_id"])
        .and_then(camera_id)
        .ok_or(NormalizeError::MissingField {
            context: "camera",
            field: "id",
        })?;
    let ip = field(value, &["ip", "IP", "ipAddress", "ip_address", "address"])
        .and_then(as_string)
        .unwrap_or_default();
    let port = field(value, &["port", "Port"])
        .and_then(as_u32)
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or(DEFAULT_ONVIF_PORT);
    let username = field(value, &["username", "user", "Username"]).and_then(as_string);
    let is_fake = field(value, &["isFake", "is_fake", "fake"])
        .and_then(as_bool)
        .unwrap_or(false);

    Ok(Camera {
        id,
        ip,
        port,
        username,
        is_fake,
    })
}

/// Accepts either a bare array or an object wrapping one under `cameras`.
pub fn cameras(value: &Value) -> Result<Vec<Camera>, NormalizeError> {
    let list = match value {
        Value::Array(list) => list,
        Value::Object(_) => field(value, &["cameras", "data"])
            .and_then(Value::as_array)
            .ok_or(NormalizeError::NotAnArray("cameras"))?,
        _ => return Err(NormalizeError::NotAnArray("cameras")),
    };
    list.iter().map(camera).collect()
}

pub fn resolution(value: &Value) -> Option<Resolution> {
    let source = field(value, &["resolution", "Resolution"]).unwrap_or(value);
    if let Some(text) = source.as_str() {
        let (width, height) = text.split_once(['x', 'X'])?;
        return Some(Resolution {
            width: width.trim().parse().ok()?,
            height: height.trim().parse().ok()?,
        });
    }
    let width = field(source, WIDTH_KEYS).and_then(as_u32)?;
    let height = field(source, HEIGHT_KEYS).and_then(as_u32)?;
    Some(Resolution { width, height })
}

/// Encoder configuration in any of the shapes the backend emits.
pub fn stream_config(value: &Value) -> Option<StreamConfig> {
    if !value.is_object() {
        return None;
    }
    let rate_control = field(value, &["rateControl", "RateControl"]);
    let from_rate_control = |keys: &[&str]| rate_control.and_then(|rc| field(rc, keys));

    let config = StreamConfig {
        resolution: resolution(value),
        fps: field(value, FPS_KEYS)
            .or_else(|| from_rate_control(FPS_KEYS))
            .and_then(as_f64),
        bitrate: field(value, BITRATE_KEYS)
            .or_else(|| from_rate_control(BITRATE_KEYS))
            .and_then(as_u32),
        encoding: field(value, ENCODING_KEYS).and_then(as_string),
    };

    if config == StreamConfig::default() {
        None
    } else {
        Some(config)
    }
}

pub fn resolutions(value: &Value) -> Vec<Resolution> {
    let list = match value {
        Value::Array(list) => Some(list),
        _ => field(
            value,
            &["resolutions", "ResolutionsAvailable", "resolutionsAvailable"],
        )
        .and_then(Value::as_array),
    };
    list.map(|items| items.iter().filter_map(resolution).collect())
        .unwrap_or_default()
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Result of a single camera check. Missing fields degrade to `unknown`.
pub fn camera_status(camera_id: &CameraId, value: &Value) -> CameraStatus {
    let status = field(value, &["status", "state", "Status"])
        .and_then(Value::as_str)
        .map(CameraState::parse_loose)
        .unwrap_or_default();
    let current_config = field(value, &["currentConfig", "current_config", "config"])
        .and_then(stream_config);
    let last_checked = field(value, &["lastChecked", "last_checked", "checkedAt"])
        .and_then(timestamp)
        .unwrap_or_else(Utc::now);
    let error = field(value, &["error", "message"]).and_then(as_string);

    CameraStatus {
        camera_id: camera_id.clone(),
        status,
        current_config,
        last_checked,
        error: if status == CameraState::Online { None } else { error },
    }
}

/// Stream analysis result, flat (`expectedWidth`, `actualFPS`) or nested
/// (`expected: {..}`, `actual: {..}`).
pub fn validation_result(fallback_id: Option<&CameraId>, value: &Value) -> ValidationResult {
    let expected = field(value, &["expected", "expectedConfig"]).and_then(stream_config);
    let actual = field(value, &["actual", "actualConfig"]).and_then(stream_config);

    let flat_u32 = |keys: &[&str]| field(value, keys).and_then(as_u32);
    let flat_f64 = |keys: &[&str]| field(value, keys).and_then(as_f64);
    let flat_str = |keys: &[&str]| field(value, keys).and_then(as_string);

    let nested_res = |cfg: &Option<StreamConfig>| cfg.as_ref().and_then(|c| c.resolution);

    let id = field(value, &["cameraId", "camera_id", "id"])
        .and_then(camera_id)
        .or_else(|| fallback_id.cloned());

    let mut result = ValidationResult {
        camera_id: id,
        is_valid: field(value, &["isValid", "is_valid", "valid"])
            .and_then(as_bool)
            .unwrap_or(false),
        expected_width: flat_u32(&["expectedWidth"]).or(nested_res(&expected).map(|r| r.width)),
        expected_height: flat_u32(&["expectedHeight"]).or(nested_res(&expected).map(|r| r.height)),
        expected_fps: flat_f64(&["expectedFPS", "expectedFps", "expectedFrameRate"])
            .or(expected.as_ref().and_then(|c| c.fps)),
        expected_bitrate: flat_u32(&["expectedBitrate", "expectedBitRate"])
            .or(expected.as_ref().and_then(|c| c.bitrate)),
        expected_encoding: flat_str(&["expectedEncoding", "expectedCodec"])
            .or(expected.as_ref().and_then(|c| c.encoding.clone())),
        actual_width: flat_u32(&["actualWidth"]).or(nested_res(&actual).map(|r| r.width)),
        actual_height: flat_u32(&["actualHeight"]).or(nested_res(&actual).map(|r| r.height)),
        actual_fps: flat_f64(&["actualFPS", "actualFps", "actualFrameRate"])
            .or(actual.as_ref().and_then(|c| c.fps)),
        actual_bitrate: flat_u32(&["actualBitrate", "actualBitRate"])
            .or(actual.as_ref().and_then(|c| c.bitrate)),
        actual_encoding: flat_str(&["actualEncoding", "actualCodec"])
            .or(actual.as_ref().and_then(|c| c.encoding.clone())),
        error: flat_str(&["error"]),
    };

    if result.error.is_some() && !result.has_actual_values() {
        result.is_valid = false;
    }
    result
}

pub fn device_info(value: &Value) -> DeviceInfo {
    let source = field(value, &["deviceInfo", "DeviceInformation"]).unwrap_or(value);
    DeviceInfo {
        manufacturer: field(source, &["manufacturer", "Manufacturer"]).and_then(as_string),
        model: field(source, &["model", "Model"]).and_then(as_string),
        firmware_version: field(source, &["firmwareVersion", "FirmwareVersion", "firmware"])
            .and_then(as_string),
        serial_number: field(source, &["serialNumber", "SerialNumber"]).and_then(as_string),
        hardware_id: field(source, &["hardwareId", "HardwareId"]).and_then(as_string),
    }
}

pub fn stream_url(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => as_string(value),
        _ => field(value, &["streamUrl", "stream_url", "uri", "Uri", "url"]).and_then(as_string),
    }
}

/// Human-readable message from a backend reply, if one was sent.
pub fn message(value: &Value) -> Option<String> {
    field(value, &["message", "error", "detail"]).and_then(as_string)
}
