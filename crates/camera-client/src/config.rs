use anyhow::{Context, Result};
use reqwest::Url;
use std::env;
use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001/api";

/// Where and how to reach the backend. Built once and handed to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
        })
    }

    pub fn from_env() -> Result<Self> {
        let base = env::var("CAMERA_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let timeout_secs = env::var("CAMERA_BACKEND_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let connect_timeout_secs = env::var("CAMERA_BACKEND_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3);

        Ok(Self {
            base_url: parse_base_url(&base).context("invalid CAMERA_BACKEND_URL")?,
            timeout: Duration::from_secs(timeout_secs.max(1)),
            connect_timeout: Duration::from_secs(connect_timeout_secs.max(1)),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `Url::join` drops the last path segment unless it ends with a slash, so
/// `http://host/api` must become `http://host/api/`.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).with_context(|| format!("'{}' is not a URL", raw))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("'{}' cannot be used as a base URL", raw);
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
