use std::sync::Arc;

use crate::config::ConsoleConfig;
use crate::connection::{ConnectionHandle, ConnectionSnapshot};
use crate::console::{BatchSummary, CameraConsole};
use crate::error::ConsoleError;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ConsoleConfig,
    console: Arc<CameraConsole>,
    connection: ConnectionHandle,
}

impl AppState {
    pub fn new(config: ConsoleConfig, console: Arc<CameraConsole>, connection: ConnectionHandle) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                console,
                connection,
            }),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn console(&self) -> &CameraConsole {
        &self.inner.console
    }

    pub fn connection(&self) -> &ConnectionHandle {
        &self.inner.connection
    }

    pub fn connection_snapshot(&self) -> ConnectionSnapshot {
        self.inner.connection.snapshot()
    }

    /// Pass a handler result through, re-checking the backend connection
    /// when the failure was a network error.
    pub fn observe<T>(&self, result: Result<T, ConsoleError>) -> Result<T, ConsoleError> {
        if let Err(err) = &result {
            if err.is_network() {
                self.inner.connection.request_check();
            }
        }
        result
    }

    /// Batch actions turn backend failures into per-camera entries; an
    /// unanswered request among them still triggers a connection check.
    pub fn observe_summary(&self, summary: &BatchSummary) {
        if summary.backend_unreachable() {
            self.inner.connection.request_check();
        }
    }
}
