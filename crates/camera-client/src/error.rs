use thiserror::Error;

/// Every failure a backend call can produce, already phrased for display.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never got a response (refused, reset, timed out).
    #[error("Network error: no response from server")]
    Network { detail: String },

    #[error("Server error: {status} {status_text}{}", detail_suffix(.message))]
    Server {
        status: u16,
        status_text: String,
        message: Option<String>,
    },

    /// The request could not be built.
    #[error("Request error: {0}")]
    Request(String),

    /// A 2xx response whose body could not be read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(" ({})", message),
        _ => String::new(),
    }
}

impl ApiError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network {
            detail: detail.into(),
        }
    }

    pub fn server(status: u16, status_text: impl Into<String>, message: Option<String>) -> Self {
        Self::Server {
            status,
            status_text: status_text.into(),
            message,
        }
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::Request(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// The backend's own explanation, falling back to the display text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::request(err.to_string())
        } else if err.is_decode() {
            Self::invalid_response(err.to_string())
        } else if let Some(status) = err.status() {
            Self::server(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                None,
            )
        } else {
            Self::network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_the_taxonomy() {
        assert_eq!(
            ApiError::network("connection refused").to_string(),
            "Network error: no response from server"
        );
        assert_eq!(
            ApiError::server(503, "Service Unavailable", None).to_string(),
            "Server error: 503 Service Unavailable"
        );
        assert_eq!(
            ApiError::request("relative URL without a base").to_string(),
            "Request error: relative URL without a base"
        );
    }

    #[test]
    fn server_message_is_surfaced() {
        let err = ApiError::server(409, "Conflict", Some("camera is streaming".into()));
        assert_eq!(err.to_string(), "Server error: 409 Conflict (camera is streaming)");
        assert_eq!(err.user_message(), "camera is streaming");
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_network());
    }
}
