use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use camera_client::ApiError;
use common::cameras::CameraId;
use common::pagination::PageJumpError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unknown camera: {0}")]
    UnknownCamera(CameraId),

    #[error("camera {0} is simulated and has no stream")]
    FakeCamera(CameraId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    PageJump(#[from] PageJumpError),

    #[error("io error: {0}")]
    Io(String),
}

impl ConsoleError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when the backend could not be reached at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_network())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Api(ApiError::Request(_)) => StatusCode::BAD_REQUEST,
            Self::Api(ApiError::Server { status, .. }) if *status == 404 => StatusCode::NOT_FOUND,
            Self::Api(ApiError::Network { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Api(_) => StatusCode::BAD_GATEWAY,
            Self::UnknownCamera(_) => StatusCode::NOT_FOUND,
            Self::FakeCamera(_) => StatusCode::CONFLICT,
            Self::InvalidInput(_) | Self::PageJump(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status_code(), body).into_response()
    }
}
