//! Operator console for an ONVIF camera-control backend: roster state,
//! batch camera actions, the connection banner, and the HTTP surface that
//! exposes them to the dashboard.

pub mod api;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod state;
pub mod websocket;

pub use config::ConsoleConfig;
pub use connection::{ConnectionHandle, ConnectionMonitor, ConnectionSnapshot, ConnectionSupervisor};
pub use console::{BatchSummary, CameraConsole, DeleteOutcome, Scope};
pub use error::ConsoleError;
pub use state::AppState;
