//! Input validation for values that end up in backend requests.
//!
//! Camera ids are interpolated into URL paths and user-entered forms feed the
//! add-camera and apply-config calls, so both are checked here before any
//! request is built.

use anyhow::{anyhow, Result};
use std::net::IpAddr;

use crate::cameras::{CameraId, ConfigRequest, NewCamera};

// ============================================================================
// CONSTANTS: Input Size Limits
// ============================================================================

/// Maximum length for camera ids
pub const MAX_ID_LENGTH: usize = 256;

/// Maximum length for host names
pub const MAX_HOST_LENGTH: usize = 253;

/// Maximum length for URIs (RTSP, HTTP)
pub const MAX_URI_LENGTH: usize = 4096;

/// Maximum length for user names
pub const MAX_NAME_LENGTH: usize = 512;

/// Largest frame size accepted in an apply-config request
pub const MAX_DIMENSION: u32 = 7680;

/// Largest frame rate accepted in an apply-config request
pub const MAX_FPS: u32 = 120;

// ============================================================================
// String Validation
// ============================================================================

/// Validate string length against a maximum
pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

/// Validate non-empty string
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Validate a camera id before it is placed in a URL path
pub fn validate_camera_id(id: &CameraId) -> Result<()> {
    let id = id.as_str();
    validate_non_empty(id, "camera id")?;
    validate_length(id, MAX_ID_LENGTH, "camera id")?;

    if id.contains("..") || id.contains('/') || id.contains('\\') || id.contains('?') {
        return Err(anyhow!(
            "camera id contains invalid characters (no path separators, '?' or '..' allowed)"
        ));
    }

    Ok(())
}

/// Validate an IP address or DNS host name
pub fn validate_host(host: &str) -> Result<()> {
    validate_non_empty(host, "ip")?;
    validate_length(host, MAX_HOST_LENGTH, "ip")?;

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    // All-numeric dotted strings that failed IP parsing are malformed addresses.
    let looks_numeric = host.chars().all(|c| c.is_ascii_digit() || c == '.');

    if looks_numeric || !host.split('.').all(valid_label) {
        return Err(anyhow!("'{}' is not a valid IP address or host name", host));
    }
    Ok(())
}

/// Validate URI (RTSP, HTTP)
pub fn validate_uri(uri: &str, field_name: &str) -> Result<()> {
    validate_non_empty(uri, field_name)?;
    validate_length(uri, MAX_URI_LENGTH, field_name)?;

    let dangerous_chars = ['`', '$', ';', '|', '&', '\n', '\r'];
    if uri.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!(
            "{} contains dangerous shell metacharacters",
            field_name
        ));
    }

    Ok(())
}

// ============================================================================
// Numeric Validation
// ============================================================================

/// Validate port number (1-65535)
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(anyhow!("Port number must be between 1 and 65535, got 0"));
    }
    Ok(())
}

/// Validate value is within range
pub fn validate_range<T: PartialOrd + std::fmt::Display>(
    value: T,
    min: T,
    max: T,
    field_name: &str,
) -> Result<()> {
    if value < min || value > max {
        return Err(anyhow!(
            "{} must be between {} and {}, got {}",
            field_name,
            min,
            max,
            value
        ));
    }
    Ok(())
}

// ============================================================================
// Request Validation
// ============================================================================

pub fn validate_new_camera(camera: &NewCamera) -> Result<()> {
    validate_host(&camera.ip)?;
    validate_port(camera.port)?;
    if let Some(url) = &camera.url {
        validate_uri(url, "url")?;
    }
    if let Some(username) = &camera.username {
        validate_length(username, MAX_NAME_LENGTH, "username")?;
    }
    Ok(())
}

pub fn validate_config_request(request: &ConfigRequest) -> Result<()> {
    validate_range(request.width, 1, MAX_DIMENSION, "width")?;
    validate_range(request.height, 1, MAX_DIMENSION, "height")?;
    validate_range(request.fps, 1, MAX_FPS, "fps")?;
    if let Some(bitrate) = request.bitrate {
        validate_range(bitrate, 1, u32::MAX, "bitrate")?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
