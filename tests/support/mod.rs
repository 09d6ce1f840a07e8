//! In-memory camera backend shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use camera_client::{
    ApiError, ApplyConfigResponse, CameraBackend, ConfigTarget, CsvImportSummary, CsvSelection,
    ImportOutcome, ValidationExport, VlcTarget,
};
use common::cameras::{
    Camera, CameraId, CameraState, CameraStatus, ConfigRequest, DeviceInfo, ExpectedConfig,
    NewCamera, Resolution, StreamConfig, ValidationResult,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub fn camera(id: &str) -> Camera {
    Camera {
        id: CameraId::new(id),
        ip: format!("192.168.1.{}", id.len() + 10),
        port: 80,
        username: Some("admin".to_string()),
        is_fake: false,
    }
}

pub fn fake_camera(id: &str) -> Camera {
    Camera {
        is_fake: true,
        ..camera(id)
    }
}

pub fn ids(raw: &[&str]) -> Vec<CameraId> {
    raw.iter().map(|id| CameraId::new(*id)).collect()
}

pub struct StubBackend {
    pub cameras: Mutex<Vec<Camera>>,
    pub calls: Mutex<Vec<String>>,
    pub failing_deletes: Mutex<HashSet<CameraId>>,
    pub failing_checks: Mutex<HashSet<CameraId>>,
    /// How long each camera check takes to answer.
    pub check_delay: Mutex<Option<Duration>>,
    /// What every camera reports when its stream is measured.
    pub actual: Mutex<StreamConfig>,
    pub import_summary: Mutex<Option<CsvImportSummary>>,
    pub csv_selection: Mutex<Option<CsvSelection>>,
    health_failures: AtomicU32,
    health_checks: AtomicU32,
}

impl StubBackend {
    pub fn new(cameras: Vec<Camera>) -> Self {
        Self {
            cameras: Mutex::new(cameras),
            calls: Mutex::new(Vec::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            failing_checks: Mutex::new(HashSet::new()),
            check_delay: Mutex::new(None),
            actual: Mutex::new(StreamConfig {
                resolution: Some(Resolution {
                    width: 1920,
                    height: 1080,
                }),
                fps: Some(30.0),
                bitrate: Some(4096),
                encoding: Some("H264".to_string()),
            }),
            import_summary: Mutex::new(None),
            csv_selection: Mutex::new(None),
            health_failures: AtomicU32::new(0),
            health_checks: AtomicU32::new(0),
        }
    }

    /// The next `n` health checks fail with a network error.
    pub fn fail_health_checks(&self, n: u32) {
        self.health_failures.store(n, Ordering::SeqCst);
    }

    pub fn health_checks(&self) -> u32 {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    async fn record(&self, call: String) {
        self.calls.lock().await.push(call);
    }

    async fn measured(&self, id: &CameraId, expected: &ExpectedConfig) -> ValidationResult {
        let actual = self.actual.lock().await.clone();
        let resolution = actual.resolution;
        let mut result = ValidationResult {
            camera_id: Some(id.clone()),
            expected_width: expected.width,
            expected_height: expected.height,
            expected_fps: expected.fps,
            expected_bitrate: expected.bitrate,
            expected_encoding: expected.encoding.clone(),
            actual_width: resolution.map(|r| r.width),
            actual_height: resolution.map(|r| r.height),
            actual_fps: actual.fps,
            actual_bitrate: actual.bitrate,
            actual_encoding: actual.encoding,
            ..ValidationResult::default()
        };
        result.is_valid = result.expected_width == result.actual_width
            && result.expected_height == result.actual_height;
        result
    }
}

#[async_trait]
impl CameraBackend for StubBackend {
    async fn list_cameras(&self) -> Result<Vec<Camera>, ApiError> {
        self.record("list".to_string()).await;
        Ok(self.cameras.lock().await.clone())
    }

    async fn add_camera(&self, camera: &NewCamera) -> Result<Camera, ApiError> {
        self.record(format!("add:{}", camera.ip)).await;
        let mut cameras = self.cameras.lock().await;
        let created = Camera {
            id: CameraId::new(format!("{}", 100 + cameras.len())),
            ip: camera.ip.clone(),
            port: camera.port,
            username: camera.username.clone(),
            is_fake: camera.is_fake,
        };
        cameras.push(created.clone());
        Ok(created)
    }

    async fn delete_camera(&self, id: &CameraId) -> Result<(), ApiError> {
        self.record(format!("delete:{}", id)).await;
        if self.failing_deletes.lock().await.contains(id) {
            return Err(ApiError::server(
                409,
                "Conflict",
                Some("camera is streaming".to_string()),
            ));
        }
        self.cameras.lock().await.retain(|camera| &camera.id != id);
        Ok(())
    }

    async fn check_camera(&self, id: &CameraId) -> Result<CameraStatus, ApiError> {
        self.record(format!("check:{}", id)).await;
        let delay = *self.check_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_checks.lock().await.contains(id) {
            return Err(ApiError::network("connection refused"));
        }
        Ok(CameraStatus {
            status: CameraState::Online,
            current_config: Some(self.actual.lock().await.clone()),
            ..CameraStatus::unknown(id.clone())
        })
    }

    async fn validate_stream(
        &self,
        id: &CameraId,
        expected: &ExpectedConfig,
    ) -> Result<ValidationResult, ApiError> {
        self.record(format!("validate:{}", id)).await;
        Ok(self.measured(id, expected).await)
    }

    async fn apply_config(
        &self,
        target: &ConfigTarget,
        config: &ConfigRequest,
    ) -> Result<ApplyConfigResponse, ApiError> {
        let ids = match target {
            ConfigTarget::Single(id) => vec![id.clone()],
            ConfigTarget::Many(ids) => ids.clone(),
        };
        let expected = ExpectedConfig::from(*config);
        let mut validation = Vec::new();
        for id in &ids {
            self.record(format!("apply:{}", id)).await;
            validation.push(self.measured(id, &expected).await);
        }
        Ok(ApplyConfigResponse {
            validation,
            applied_config: None,
            configuration_errors: Vec::new(),
        })
    }

    async fn launch_vlc(&self, target: &VlcTarget) -> Result<String, ApiError> {
        match target {
            VlcTarget::Camera(id) => self.record(format!("vlc:{}", id)).await,
            VlcTarget::Profile(token) => self.record(format!("vlc-profile:{}", token)).await,
        }
        Ok("VLC launched".to_string())
    }

    async fn import_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<CsvImportSummary, ApiError> {
        self.record(format!("import:{}:{}", file_name, contents.len())).await;
        Ok(self
            .import_summary
            .lock()
            .await
            .clone()
            .unwrap_or(CsvImportSummary {
                message: "imported".to_string(),
                success_count: 1,
                error_count: 0,
                outcome: ImportOutcome::Complete,
            }))
    }

    async fn choose_from_csv(&self, file_name: &str, _contents: Vec<u8>) -> Result<CsvSelection, ApiError> {
        self.record(format!("choose:{}", file_name)).await;
        Ok(self.csv_selection.lock().await.clone().unwrap_or_default())
    }

    async fn export_validation_csv(
        &self,
        results: &[ValidationResult],
    ) -> Result<ValidationExport, ApiError> {
        self.record(format!("export:{}", results.len())).await;
        let mut contents = String::from("cameraId,isValid\n");
        for result in results {
            let id = result.camera_id.as_ref().map(CameraId::as_str).unwrap_or("");
            contents.push_str(&format!("{},{}\n", id, result.is_valid));
        }
        Ok(ValidationExport {
            file_name: "validation_results_2024-03-09T14-05-07-000Z.csv".to_string(),
            contents: contents.into_bytes(),
        })
    }

    async fn camera_info(&self) -> Result<Value, ApiError> {
        Ok(json!({}))
    }

    async fn resolutions(&self, _config_token: &str) -> Result<Vec<Resolution>, ApiError> {
        Ok(Vec::new())
    }

    async fn encoder_config(&self, _config_token: &str) -> Result<Option<StreamConfig>, ApiError> {
        Ok(None)
    }

    async fn device_info(&self) -> Result<DeviceInfo, ApiError> {
        Ok(DeviceInfo::default())
    }

    async fn stream_url(&self, profile_token: &str) -> Result<String, ApiError> {
        Ok(format!("rtsp://camera/{}", profile_token))
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let remaining = self.health_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.health_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ApiError::network("connection refused"));
        }
        Ok(())
    }
}
