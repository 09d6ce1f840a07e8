use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let connection = state.connection_snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "camera-console",
            "version": common::VERSION,
            "backendConnected": connection.is_connected(),
        })),
    )
}
