use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use camera_client::{CsvImportSummary, ImportOutcome};
use serde::Deserialize;

use crate::console::CsvChoice;
use crate::error::ConsoleError;
use crate::state::AppState;

const DEFAULT_UPLOAD_NAME: &str = "cameras.csv";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub file_name: Option<String>,
}

impl UploadQuery {
    fn file_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
    }
}

fn require_body(body: &Bytes) -> Result<(), ConsoleError> {
    if body.is_empty() {
        return Err(ConsoleError::invalid_input("CSV body is empty"));
    }
    Ok(())
}

/// Partial imports answer 206, mirroring the backend.
pub async fn import_csv(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<CsvImportSummary>), ConsoleError> {
    require_body(&body)?;
    let summary = state.observe(
        state
            .console()
            .import_csv(query.file_name(), body.to_vec())
            .await,
    )?;

    let status = match summary.outcome {
        ImportOutcome::Complete => StatusCode::OK,
        ImportOutcome::Partial => StatusCode::PARTIAL_CONTENT,
        ImportOutcome::Failed => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(summary)))
}

pub async fn choose_from_csv(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<CsvChoice>, ConsoleError> {
    require_body(&body)?;
    let choice = state.observe(
        state
            .console()
            .choose_from_csv(query.file_name(), body.to_vec())
            .await,
    )?;
    Ok(Json(choice))
}

/// Saves the CSV under the export directory and returns it as a download.
pub async fn export_validation(State(state): State<AppState>) -> Result<Response, ConsoleError> {
    let export_dir = state.config().export_dir.clone();
    let (_path, export) = state.observe(
        state
            .console()
            .save_validation_export(&export_dir)
            .await,
    )?;

    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.contents,
    )
        .into_response())
}
