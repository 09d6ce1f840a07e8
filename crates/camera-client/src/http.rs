use async_trait::async_trait;
use chrono::Utc;
use common::cameras::{
    Camera, CameraId, CameraStatus, ConfigRequest, DeviceInfo, ExpectedConfig, NewCamera,
    Resolution, StreamConfig, ValidationResult,
};
use common::normalize;
use common::validation::validate_camera_id;
use reqwest::{multipart, Client, RequestBuilder, Response, Url};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::backend::CameraBackend;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::types::{
    validation_export_file_name, ApplyConfigResponse, ConfigTarget, ConfigurationError,
    CsvImportSummary, CsvSelection, ValidationExport, VlcTarget,
};

const MAX_PLAIN_ERROR_LEN: usize = 512;

/// [`CameraBackend`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpCameraBackend {
    base: Url,
    client: Client,
}

impl HttpCameraBackend {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            base: config.base_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::request(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn camera_endpoint(&self, id: &CameraId) -> Result<Url, ApiError> {
        validate_camera_id(id).map_err(|e| ApiError::request(e.to_string()))?;
        let mut url = self.endpoint("cameras")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::request("backend URL cannot take path segments"))?
            .push(id.as_str());
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        ensure_success(response).await
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.send(request).await?;
        read_json(response).await
    }

    fn csv_form(file_name: &str, contents: Vec<u8>) -> Result<multipart::Form, ApiError> {
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        Ok(multipart::Form::new().part("csvFile", part))
    }
}

/// Turn a non-2xx response into [`ApiError::Server`], keeping the backend's
/// `{message}` (or a short plain-text body) when it sent one.
async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| normalize::message(&value))
        .or_else(|| {
            let text = body.trim();
            let plain = !text.is_empty() && !text.starts_with('<') && text.len() <= MAX_PLAIN_ERROR_LEN;
            plain.then(|| text.to_string())
        });

    Err(ApiError::server(
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        message,
    ))
}

async fn read_json(response: Response) -> Result<Value, ApiError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::invalid_response(e.to_string()))
}

fn count(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `validation` may be one object or a list of them.
fn validation_list(fallback_id: Option<&CameraId>, value: Option<&Value>) -> Vec<ValidationResult> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| normalize::validation_result(fallback_id, item))
            .collect(),
        Some(item @ Value::Object(_)) => vec![normalize::validation_result(fallback_id, item)],
        _ => Vec::new(),
    }
}

fn configuration_errors(value: Option<&Value>) -> Vec<ConfigurationError> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(message) => Some(ConfigurationError {
                camera_id: None,
                message: message.clone(),
            }),
            Value::Object(_) => Some(ConfigurationError {
                camera_id: item
                    .get("cameraId")
                    .or_else(|| item.get("id"))
                    .and_then(|id| serde_json::from_value(id.clone()).ok()),
                message: normalize::message(item).unwrap_or_else(|| item.to_string()),
            }),
            _ => None,
        })
        .collect()
}

fn apply_config_response(target: &ConfigTarget, value: &Value) -> ApplyConfigResponse {
    let fallback_id = match target {
        ConfigTarget::Single(id) => Some(id),
        ConfigTarget::Many(_) => None,
    };
    ApplyConfigResponse {
        validation: validation_list(fallback_id, value.get("validation")),
        applied_config: value
            .get("appliedConfig")
            .and_then(normalize::stream_config),
        configuration_errors: configuration_errors(value.get("configurationErrors")),
    }
}

fn csv_selection(value: &Value) -> CsvSelection {
    let selected_cameras: Vec<Camera> = value
        .get("selectedCameras")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| normalize::camera(item).ok())
                .collect()
        })
        .unwrap_or_default();

    let selected_camera_ids = value
        .get("selectedCameraIds")
        .and_then(|ids| serde_json::from_value::<Vec<CameraId>>(ids.clone()).ok())
        .unwrap_or_else(|| selected_cameras.iter().map(|c| c.id.clone()).collect());

    let unmatched_ips: Vec<String> = value
        .get("unmatchedIPs")
        .and_then(Value::as_array)
        .map(|ips| {
            ips.iter()
                .filter_map(|ip| ip.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    CsvSelection {
        matched_count: value
            .get("matchedCount")
            .map(|_| count(value, "matchedCount"))
            .unwrap_or(selected_camera_ids.len() as u32),
        unmatched_count: value
            .get("unmatchedCount")
            .map(|_| count(value, "unmatchedCount"))
            .unwrap_or(unmatched_ips.len() as u32),
        selected_camera_ids,
        selected_cameras,
        unmatched_ips,
        message: text(value, "message"),
    }
}

#[async_trait]
impl CameraBackend for HttpCameraBackend {
    #[instrument(skip_all)]
    async fn list_cameras(&self) -> Result<Vec<Camera>, ApiError> {
        let value = self.send_json(self.client.get(self.endpoint("cameras")?)).await?;
        let cameras =
            normalize::cameras(&value).map_err(|e| ApiError::invalid_response(e.to_string()))?;
        debug!(count = cameras.len(), "fetched camera roster");
        Ok(cameras)
    }

    #[instrument(skip_all, fields(ip = %camera.ip, port = camera.port))]
    async fn add_camera(&self, camera: &NewCamera) -> Result<Camera, ApiError> {
        let request = self.client.post(self.endpoint("cameras")?).json(camera);
        let value = self.send_json(request).await?;
        let created = value.get("camera").unwrap_or(&value);
        normalize::camera(created).map_err(|e| ApiError::invalid_response(e.to_string()))
    }

    #[instrument(skip_all, fields(camera_id = %id))]
    async fn delete_camera(&self, id: &CameraId) -> Result<(), ApiError> {
        self.send(self.client.delete(self.camera_endpoint(id)?)).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(camera_id = %id))]
    async fn check_camera(&self, id: &CameraId) -> Result<CameraStatus, ApiError> {
        let request = self
            .client
            .post(self.endpoint("check-camera")?)
            .json(&json!({ "cameraId": id }));
        let value = self.send_json(request).await?;
        let status = value.get("status").filter(|s| s.is_object()).unwrap_or(&value);
        Ok(normalize::camera_status(id, status))
    }

    #[instrument(skip_all, fields(camera_id = %id))]
    async fn validate_stream(
        &self,
        id: &CameraId,
        expected: &ExpectedConfig,
    ) -> Result<ValidationResult, ApiError> {
        let request = self
            .client
            .post(self.endpoint("validate-stream")?)
            .json(&json!({ "cameraId": id, "expected": expected }));
        let value = self.send_json(request).await?;
        let result = value
            .get("validation")
            .filter(|v| v.is_object())
            .unwrap_or(&value);
        Ok(normalize::validation_result(Some(id), result))
    }

    #[instrument(skip_all, fields(width = config.width, height = config.height, fps = config.fps))]
    async fn apply_config(
        &self,
        target: &ConfigTarget,
        config: &ConfigRequest,
    ) -> Result<ApplyConfigResponse, ApiError> {
        let mut body = serde_json::to_value(config).map_err(|e| ApiError::request(e.to_string()))?;
        match target {
            ConfigTarget::Single(id) => body["cameraId"] = json!(id),
            ConfigTarget::Many(ids) => body["cameraIds"] = json!(ids),
        }

        let request = self.client.post(self.endpoint("apply-config")?).json(&body);
        let value = self.send_json(request).await?;
        Ok(apply_config_response(target, &value))
    }

    #[instrument(skip_all)]
    async fn launch_vlc(&self, target: &VlcTarget) -> Result<String, ApiError> {
        let request = match target {
            VlcTarget::Camera(id) => self
                .client
                .post(self.endpoint("vlc")?)
                .json(&json!({ "cameraId": id })),
            VlcTarget::Profile(token) => self
                .client
                .post(self.endpoint("camera/launch-vlc")?)
                .json(&json!({ "profileToken": token })),
        };
        let value = self.send_json(request).await?;
        Ok(normalize::message(&value).unwrap_or_else(|| "VLC launched".to_string()))
    }

    #[instrument(skip_all, fields(file = %file_name, bytes = contents.len()))]
    async fn import_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<CsvImportSummary, ApiError> {
        let form = Self::csv_form(file_name, contents)?;
        let response = self
            .send(self.client.post(self.endpoint("cameras/import-csv")?).multipart(form))
            .await?;
        let http_status = response.status().as_u16();
        let value = read_json(response).await?;

        let success_count = count(&value, "successCount");
        let error_count = count(&value, "errorCount");
        Ok(CsvImportSummary {
            message: text(&value, "message"),
            success_count,
            error_count,
            outcome: CsvImportSummary::classify(http_status, success_count, error_count),
        })
    }

    #[instrument(skip_all, fields(file = %file_name, bytes = contents.len()))]
    async fn choose_from_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<CsvSelection, ApiError> {
        let form = Self::csv_form(file_name, contents)?;
        let request = self.client.post(self.endpoint("choose-cam-from-csv")?).multipart(form);
        let value = self.send_json(request).await?;
        Ok(csv_selection(&value))
    }

    #[instrument(skip_all, fields(results = results.len()))]
    async fn export_validation_csv(
        &self,
        results: &[ValidationResult],
    ) -> Result<ValidationExport, ApiError> {
        let request = self
            .client
            .post(self.endpoint("export-validation-csv")?)
            .json(&json!({ "validation": results }));
        let response = self.send(request).await?;
        let contents = response.bytes().await?.to_vec();
        Ok(ValidationExport {
            file_name: validation_export_file_name(Utc::now()),
            contents,
        })
    }

    async fn camera_info(&self) -> Result<Value, ApiError> {
        self.send_json(self.client.get(self.endpoint("camera/info")?)).await
    }

    async fn resolutions(&self, config_token: &str) -> Result<Vec<Resolution>, ApiError> {
        let request = self
            .client
            .get(self.endpoint("camera/resolutions")?)
            .query(&[("configToken", config_token)]);
        let value = self.send_json(request).await?;
        Ok(normalize::resolutions(&value))
    }

    async fn encoder_config(&self, config_token: &str) -> Result<Option<StreamConfig>, ApiError> {
        let request = self
            .client
            .get(self.endpoint("camera/config")?)
            .query(&[("configToken", config_token)]);
        let value = self.send_json(request).await?;
        let config = value.get("config").unwrap_or(&value);
        Ok(normalize::stream_config(config))
    }

    async fn device_info(&self) -> Result<DeviceInfo, ApiError> {
        let value = self
            .send_json(self.client.get(self.endpoint("camera/device-info")?))
            .await?;
        Ok(normalize::device_info(&value))
    }

    async fn stream_url(&self, profile_token: &str) -> Result<String, ApiError> {
        let request = self
            .client
            .get(self.endpoint("camera/stream-url")?)
            .query(&[("profileToken", profile_token)]);
        let value = self.send_json(request).await?;
        normalize::stream_url(&value)
            .ok_or_else(|| ApiError::invalid_response("no stream URL in response"))
    }

    async fn health_check(&self) -> Result<(), ApiError> {
        self.send(self.client.get(self.endpoint("cameras")?)).await?;
        Ok(())
    }
}
