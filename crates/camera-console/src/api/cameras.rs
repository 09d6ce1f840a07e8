use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::cameras::{Camera, CameraId, NewCamera};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::console::PageView;
use crate::error::ConsoleError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

pub async fn list_page(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Json<PageView> {
    Json(state.console().page_view(query.page).await)
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, ConsoleError> {
    let count = state.observe(state.console().refresh().await)?;
    Ok(Json(json!({ "count": count })))
}

/// What the operator typed into the page box, or a navigation keyword.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageInput {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: PageInput,
}

pub async fn change_page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Result<Json<Value>, ConsoleError> {
    let console = state.console();
    let current_page = match request.page {
        PageInput::Number(n) => console.jump_page(&n.to_string()).await?,
        PageInput::Text(text) => match text.trim() {
            "next" => console.next_page().await,
            "previous" | "prev" => console.previous_page().await,
            input => console.jump_page(input).await?,
        },
    };
    Ok(Json(json!({ "currentPage": current_page })))
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub ids: Vec<CameraId>,
}

pub async fn get_selection(State(state): State<AppState>) -> Json<Value> {
    let ids = state.console().selection().await;
    Json(json!({ "ids": ids }))
}

pub async fn set_selection(
    State(state): State<AppState>,
    Json(request): Json<SelectionRequest>,
) -> Result<Json<Value>, ConsoleError> {
    let selected = state.console().set_selection(request.ids).await?;
    Ok(Json(json!({ "selected": selected })))
}

pub async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.console().clear_selection().await;
    StatusCode::NO_CONTENT
}

pub async fn add_camera(
    State(state): State<AppState>,
    Json(camera): Json<NewCamera>,
) -> Result<(StatusCode, Json<Camera>), ConsoleError> {
    let created = state.observe(state.console().add_camera(camera).await)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn launch_vlc(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ConsoleError> {
    let id = CameraId::new(id);
    let message = state.observe(state.console().launch_vlc(&id).await)?;
    info!(camera_id = %id, "vlc launched");
    Ok(Json(json!({ "message": message })))
}
