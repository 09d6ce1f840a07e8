use anyhow::Context;
use camera_client::{CameraBackend, ClientConfig, HttpCameraBackend};
use camera_console::{api, AppState, CameraConsole, ConnectionSupervisor, ConsoleConfig};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = telemetry::init_with_service("camera-console");

    let config = ConsoleConfig::from_env()?;
    let client_config = ClientConfig::from_env()?;
    info!("Starting camera console on {}", config.bind_addr);
    info!("Backend: {}", client_config.base_url);
    info!("Frontend directory: {}", config.frontend_dir.display());

    let backend: Arc<dyn CameraBackend> =
        Arc::new(HttpCameraBackend::new(&client_config).context("failed to build backend client")?);
    let console = Arc::new(CameraConsole::new(
        backend.clone(),
        config.match_rules,
        config.page_size,
    ));

    if let Err(err) = console.refresh().await {
        warn!(error = %err, "initial roster load failed; will reload on reconnect");
    }

    let supervisor = ConnectionSupervisor::spawn(backend, console.clone(), config.poll_interval);
    let state = AppState::new(config.clone(), console, supervisor.handle());
    let app = api::app(state, &config.frontend_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Camera console listening on http://{}", config.bind_addr);
    info!("WebSocket available at ws://{}/ws", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.shutdown().await;
    info!("camera console stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
