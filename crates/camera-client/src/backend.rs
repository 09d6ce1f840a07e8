use async_trait::async_trait;
use common::cameras::{
    Camera, CameraId, CameraStatus, ConfigRequest, DeviceInfo, ExpectedConfig, NewCamera,
    Resolution, StreamConfig, ValidationResult,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::types::{
    ApplyConfigResponse, ConfigTarget, CsvImportSummary, CsvSelection, ValidationExport, VlcTarget,
};

/// The backend operations the console depends on.
///
/// Implementations never retry; callers decide how to fan out and how to
/// react to failures.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    // Roster
    async fn list_cameras(&self) -> Result<Vec<Camera>, ApiError>;
    async fn add_camera(&self, camera: &NewCamera) -> Result<Camera, ApiError>;
    async fn delete_camera(&self, id: &CameraId) -> Result<(), ApiError>;

    // Per-camera actions
    async fn check_camera(&self, id: &CameraId) -> Result<CameraStatus, ApiError>;
    async fn validate_stream(
        &self,
        id: &CameraId,
        expected: &ExpectedConfig,
    ) -> Result<ValidationResult, ApiError>;
    async fn apply_config(
        &self,
        target: &ConfigTarget,
        config: &ConfigRequest,
    ) -> Result<ApplyConfigResponse, ApiError>;
    async fn launch_vlc(&self, target: &VlcTarget) -> Result<String, ApiError>;

    // CSV
    async fn import_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<CsvImportSummary, ApiError>;
    async fn choose_from_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<CsvSelection, ApiError>;
    async fn export_validation_csv(
        &self,
        results: &[ValidationResult],
    ) -> Result<ValidationExport, ApiError>;

    // Read-only camera metadata
    async fn camera_info(&self) -> Result<Value, ApiError>;
    async fn resolutions(&self, config_token: &str) -> Result<Vec<Resolution>, ApiError>;
    async fn encoder_config(&self, config_token: &str) -> Result<Option<StreamConfig>, ApiError>;
    async fn device_info(&self) -> Result<DeviceInfo, ApiError>;
    async fn stream_url(&self, profile_token: &str) -> Result<String, ApiError>;

    // Health
    async fn health_check(&self) -> Result<(), ApiError>;
}
