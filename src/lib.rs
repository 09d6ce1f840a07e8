//! Camera management console for an ONVIF camera-control backend.
//!
//! The workspace is split into the shared domain types (`common`), the typed
//! backend client (`camera_client`) and the console state container plus its
//! HTTP surface (`camera_console`).

pub use camera_client;
pub use camera_console;
pub use common;
