//! HTTP client against an in-process stub of the camera backend.

use anyhow::Result;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use camera_client::{
    ApiError, CameraBackend, ClientConfig, ConfigTarget, HttpCameraBackend, ImportOutcome,
};
use common::cameras::{CameraId, CameraState, ConfigRequest, Resolution, ValidationResult};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorded {
    async fn push(&self, route: &str, body: Value) {
        self.bodies.lock().await.push((route.to_string(), body));
    }

    async fn last(&self, route: &str) -> Option<Value> {
        self.bodies
            .lock()
            .await
            .iter()
            .rev()
            .find(|(r, _)| r == route)
            .map(|(_, body)| body.clone())
    }
}

async fn list_cameras() -> Json<Value> {
    Json(json!([
        {"id": 1, "ip": "10.0.0.1", "port": 80, "username": "admin"},
        {"_id": "cam-2", "IP": "10.0.0.2", "Port": 8080, "isFake": true}
    ]))
}

async fn delete_camera(Path(id): Path<String>) -> impl IntoResponse {
    if id == "2" {
        (
            StatusCode::CONFLICT,
            Json(json!({"message": "camera is streaming"})),
        )
            .into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn check_camera(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded.push("check-camera", body).await;
    Json(json!({
        "status": "online",
        "currentConfig": {
            "Resolution": {"Width": 1280, "Height": 720},
            "FrameRateLimit": 25,
            "Encoding": "H264"
        }
    }))
}

async fn apply_config(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded.push("apply-config", body).await;
    Json(json!({
        "validation": [
            {"cameraId": 1, "isValid": false, "expectedWidth": 1920, "expectedHeight": 1080,
             "actualWidth": 1280, "actualHeight": 1080},
            {"cameraId": 3, "isValid": true, "expectedWidth": 1920, "expectedHeight": 1080,
             "actualWidth": 1920, "actualHeight": 1080}
        ],
        "appliedConfig": {"width": 1920, "height": 1080, "fps": 30},
        "configurationErrors": [{"cameraId": 4, "message": "camera offline"}]
    }))
}

async fn import_csv(State(recorded): State<Recorded>, mut multipart: Multipart) -> impl IntoResponse {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let text = field.text().await.unwrap_or_default();
        recorded
            .push(
                "import-csv",
                json!({"field": name, "fileName": file_name, "contentType": content_type, "text": text}),
            )
            .await;
    }
    (
        StatusCode::PARTIAL_CONTENT,
        Json(json!({"message": "2 imported, 1 failed", "successCount": 2, "errorCount": 1})),
    )
}

async fn export_validation(State(recorded): State<Recorded>, Json(body): Json<Value>) -> impl IntoResponse {
    recorded.push("export-validation-csv", body).await;
    (
        [(header::CONTENT_TYPE, "text/csv")],
        "cameraId,isValid\n1,false\n",
    )
}

async fn camera_info() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "<html><body>boom</body></html>",
    )
}

async fn device_info() -> Json<Value> {
    Json(json!({"Manufacturer": "Acme", "Model": "X1", "FirmwareVersion": "2.4.1"}))
}

async fn stream_url() -> Json<Value> {
    Json(json!({}))
}

async fn launch_vlc(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"message": format!("VLC launched for {}", body["cameraId"])}))
}

fn stub_backend(recorded: Recorded) -> Router {
    Router::new()
        .route("/api/cameras", get(list_cameras))
        .route("/api/cameras/:id", delete(delete_camera))
        .route("/api/check-camera", post(check_camera))
        .route("/api/apply-config", post(apply_config))
        .route("/api/cameras/import-csv", post(import_csv))
        .route("/api/export-validation-csv", post(export_validation))
        .route("/api/vlc", post(launch_vlc))
        .route("/api/camera/info", get(camera_info))
        .route("/api/camera/device-info", get(device_info))
        .route("/api/camera/stream-url", get(stream_url))
        .with_state(recorded)
}

async fn spawn_router(router: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .expect("server failed");
    });
    Ok((addr, handle))
}

async fn setup_client() -> Result<(HttpCameraBackend, Recorded, JoinHandle<()>)> {
    let _ = tracing_subscriber::fmt::try_init();
    let recorded = Recorded::default();
    let (addr, task) = spawn_router(stub_backend(recorded.clone())).await?;
    let config = ClientConfig::new(&format!("http://{}/api", addr))?;
    Ok((HttpCameraBackend::new(&config)?, recorded, task))
}

#[tokio::test]
async fn list_normalizes_mixed_payloads() -> Result<()> {
    let (client, _recorded, task) = setup_client().await?;

    let cameras = client.list_cameras().await?;
    assert_eq!(cameras.len(), 2);
    assert_eq!(cameras[0].id, CameraId::new("1"));
    assert_eq!(cameras[0].username.as_deref(), Some("admin"));
    assert_eq!(cameras[1].id, CameraId::new("cam-2"));
    assert_eq!(cameras[1].ip, "10.0.0.2");
    assert_eq!(cameras[1].port, 8080);
    assert!(cameras[1].is_fake);

    task.abort();
    Ok(())
}

#[tokio::test]
async fn delete_failure_surfaces_backend_message() -> Result<()> {
    let (client, _recorded, task) = setup_client().await?;

    client.delete_camera(&CameraId::new("1")).await?;
    let err = client.delete_camera(&CameraId::new("2")).await.unwrap_err();

    assert_eq!(err.status(), Some(409));
    assert_eq!(err.to_string(), "Server error: 409 Conflict (camera is streaming)");
    assert_eq!(err.user_message(), "camera is streaming");

    task.abort();
    Ok(())
}

#[tokio::test]
async fn html_error_bodies_are_not_surfaced() -> Result<()> {
    let (client, _recorded, task) = setup_client().await?;

    let err = client.camera_info().await.unwrap_err();
    assert_eq!(err, ApiError::server(500, "Internal Server Error", None));

    task.abort();
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() -> Result<()> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let client = HttpCameraBackend::new(&ClientConfig::new(&format!("http://{}/api", addr))?)?;
    let err = client.health_check().await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.to_string(), "Network error: no response from server");
    Ok(())
}

#[tokio::test]
async fn check_camera_maps_onvif_casing() -> Result<()> {
    let (client, recorded, task) = setup_client().await?;

    let status = client.check_camera(&CameraId::new("7")).await?;
    assert_eq!(status.camera_id, CameraId::new("7"));
    assert_eq!(status.status, CameraState::Online);
    let config = status.current_config.ok_or_else(|| anyhow::anyhow!("no config"))?;
    assert_eq!(
        config.resolution,
        Some(Resolution {
            width: 1280,
            height: 720
        })
    );
    assert_eq!(config.fps, Some(25.0));
    assert_eq!(recorded.last("check-camera").await, Some(json!({"cameraId": "7"})));

    task.abort();
    Ok(())
}

#[tokio::test]
async fn apply_config_to_many_cameras() -> Result<()> {
    let (client, recorded, task) = setup_client().await?;

    let target = ConfigTarget::Many(vec![CameraId::new("1"), CameraId::new("3")]);
    let response = client
        .apply_config(
            &target,
            &ConfigRequest {
                width: 1920,
                height: 1080,
                fps: 30,
                bitrate: None,
            },
        )
        .await?;

    assert_eq!(
        recorded.last("apply-config").await,
        Some(json!({"width": 1920, "height": 1080, "fps": 30, "cameraIds": ["1", "3"]}))
    );
    assert_eq!(response.validation.len(), 2);
    assert_eq!(response.validation[0].actual_width, Some(1280));
    assert!(!response.validation[0].is_valid);
    assert_eq!(response.configuration_errors.len(), 1);
    assert_eq!(response.configuration_errors[0].camera_id, Some(CameraId::new("4")));
    assert_eq!(response.configuration_errors[0].message, "camera offline");

    task.abort();
    Ok(())
}

#[tokio::test]
async fn import_csv_uploads_multipart_and_reports_partial() -> Result<()> {
    let (client, recorded, task) = setup_client().await?;

    let summary = client
        .import_csv("cameras.csv", b"ip,port\n10.0.0.1,80\n".to_vec())
        .await?;

    assert_eq!(summary.outcome, ImportOutcome::Partial);
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.message, "2 imported, 1 failed");

    let upload = recorded
        .last("import-csv")
        .await
        .ok_or_else(|| anyhow::anyhow!("no upload recorded"))?;
    assert_eq!(upload["field"], "csvFile");
    assert_eq!(upload["fileName"], "cameras.csv");
    assert_eq!(upload["contentType"], "text/csv");
    assert_eq!(upload["text"], "ip,port\n10.0.0.1,80\n");

    task.abort();
    Ok(())
}

#[tokio::test]
async fn export_returns_csv_bytes_with_timestamped_name() -> Result<()> {
    let (client, recorded, task) = setup_client().await?;

    let results = vec![ValidationResult {
        camera_id: Some(CameraId::new("1")),
        is_valid: false,
        ..ValidationResult::default()
    }];
    let export = client.export_validation_csv(&results).await?;

    assert!(export.file_name.starts_with("validation_results_"));
    assert!(export.file_name.ends_with("Z.csv"));
    assert!(!export.file_name.contains(':'));
    assert_eq!(export.contents, b"cameraId,isValid\n1,false\n".to_vec());

    let body = recorded
        .last("export-validation-csv")
        .await
        .ok_or_else(|| anyhow::anyhow!("no export recorded"))?;
    assert_eq!(body["validation"][0]["cameraId"], "1");

    task.abort();
    Ok(())
}

#[tokio::test]
async fn metadata_endpoints() -> Result<()> {
    let (client, _recorded, task) = setup_client().await?;

    let info = client.device_info().await?;
    assert_eq!(info.manufacturer.as_deref(), Some("Acme"));
    assert_eq!(info.firmware_version.as_deref(), Some("2.4.1"));

    let err = client.stream_url("profile_1").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));

    let message = client
        .launch_vlc(&camera_client::VlcTarget::Camera(CameraId::new("1")))
        .await?;
    assert_eq!(message, "VLC launched for \"1\"");

    task.abort();
    Ok(())
}
