use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::cameras::{ConfigRequest, ExpectedConfig};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::console::{BatchSummary, Scope, StreamOutcome};
use crate::error::ConsoleError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub scope: Scope,
}

pub async fn check(
    State(state): State<AppState>,
    payload: Option<Json<CheckRequest>>,
) -> Json<Value> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let summary: BatchSummary = state.console().check(request.scope).await;
    state.observe_summary(&summary);
    Json(json!({
        "message": summary.message(),
        "summary": summary,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub expected: ExpectedConfig,
}

pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Json<StreamOutcome> {
    let outcome = state
        .console()
        .validate(request.scope, request.expected)
        .await;
    state.observe_summary(&outcome.summary);
    Json(outcome)
}

pub async fn apply_config(
    State(state): State<AppState>,
    Json(config): Json<ConfigRequest>,
) -> Result<Json<StreamOutcome>, ConsoleError> {
    let outcome = state.observe(state.console().apply_config_to_selection(config).await)?;
    state.observe_summary(&outcome.summary);
    Ok(Json(outcome))
}

/// 200 when every selected camera was deleted, 207 when the run stopped
/// part way.
pub async fn delete_selected(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ConsoleError> {
    let outcome = state.observe(state.console().delete_selected().await)?;
    if let Some(failure) = &outcome.failed {
        if failure.source.is_network() {
            state.connection().request_check();
        }
    }

    let status = if outcome.is_complete() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((
        status,
        Json(json!({
            "message": outcome.message(),
            "outcome": outcome,
        })),
    ))
}
