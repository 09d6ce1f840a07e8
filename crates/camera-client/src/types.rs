use chrono::{DateTime, SecondsFormat, Utc};
use common::cameras::{Camera, CameraId, StreamConfig, ValidationResult};
use serde::{Deserialize, Serialize};

/// Which camera(s) an apply-config request addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    Single(CameraId),
    Many(Vec<CameraId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationError {
    pub camera_id: Option<CameraId>,
    pub message: String,
}

/// Reply of `POST /apply-config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyConfigResponse {
    pub validation: Vec<ValidationResult>,
    pub applied_config: Option<StreamConfig>,
    pub configuration_errors: Vec<ConfigurationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Complete,
    Partial,
    Failed,
}

/// Reply of `POST /cameras/import-csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImportSummary {
    pub message: String,
    pub success_count: u32,
    pub error_count: u32,
    pub outcome: ImportOutcome,
}

impl CsvImportSummary {
    /// 206 always means partial; otherwise the counts decide.
    pub fn classify(http_status: u16, success_count: u32, error_count: u32) -> ImportOutcome {
        if http_status == 206 {
            ImportOutcome::Partial
        } else if error_count == 0 {
            ImportOutcome::Complete
        } else if success_count == 0 {
            ImportOutcome::Failed
        } else {
            ImportOutcome::Partial
        }
    }
}

/// Reply of `POST /choose-cam-from-csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvSelection {
    pub selected_camera_ids: Vec<CameraId>,
    pub selected_cameras: Vec<Camera>,
    #[serde(rename = "unmatchedIPs")]
    pub unmatched_ips: Vec<String>,
    pub matched_count: u32,
    pub unmatched_count: u32,
    pub message: String,
}

/// What a VLC launch is keyed by; the backend has one endpoint for each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlcTarget {
    Camera(CameraId),
    Profile(String),
}

/// CSV bytes returned by `POST /export-validation-csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationExport {
    pub file_name: String,
    pub contents: Vec<u8>,
}

/// `validation_results_<ISO-8601 instant>.csv`, with `:` and `.` replaced so
/// the name is valid on every filesystem.
pub fn validation_export_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("validation_results_{}.csv", stamp)
}
