use anyhow::{Context, Result};
use common::matching::{MatchRules, DEFAULT_BITRATE_TOLERANCE, DEFAULT_FPS_TOLERANCE};
use common::pagination::DEFAULT_PAGE_SIZE;
use std::env;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub bind_addr: SocketAddr,
    pub frontend_dir: PathBuf,
    pub page_size: NonZeroUsize,
    pub poll_interval: Duration,
    pub export_dir: PathBuf,
    pub match_rules: MatchRules,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8090)),
            frontend_dir: PathBuf::from("./crates/camera-console/frontend/dist"),
            page_size: NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN),
            poll_interval: Duration::from_secs(5),
            export_dir: PathBuf::from("."),
            match_rules: MatchRules::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = match env::var("CAMERA_CONSOLE_ADDR") {
            Ok(addr) => addr.parse().context("invalid CAMERA_CONSOLE_ADDR")?,
            Err(_) => defaults.bind_addr,
        };

        let page_size = env::var("CONSOLE_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .and_then(NonZeroUsize::new)
            .unwrap_or(defaults.page_size);

        let poll_secs = env::var("CONSOLE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);

        let fps_tolerance = env::var("CONSOLE_FPS_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(DEFAULT_FPS_TOLERANCE);

        let bitrate_tolerance = env::var("CONSOLE_BITRATE_TOLERANCE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(DEFAULT_BITRATE_TOLERANCE);

        Ok(Self {
            bind_addr,
            frontend_dir: env::var("FRONTEND_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.frontend_dir),
            page_size,
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            export_dir: env::var("CONSOLE_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
            match_rules: MatchRules {
                fps_tolerance,
                bitrate_tolerance,
            },
        })
    }
}
