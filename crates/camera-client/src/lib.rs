//! Typed client for the ONVIF camera-control backend.
//!
//! [`CameraBackend`] is the seam the console is written against;
//! [`HttpCameraBackend`] implements it over the backend's REST surface.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use backend::CameraBackend;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::HttpCameraBackend;
pub use types::*;
