//! Prediction endpoint configuration, fixed for the lifetime of a client.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:7860";
/// Path of the classification route below the base URL.
pub const PREDICT_PATH: &str = "/api/predict";

pub const ENV_API_URL: &str = "NEUROSCAN_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "NEUROSCAN_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// `None` keeps the HTTP client's default timeout.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `NEUROSCAN_API_URL` and `NEUROSCAN_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(url) = lookup(ENV_API_URL).map(|u| u.trim().to_string())
            && !url.is_empty()
        {
            cfg.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => cfg.timeout = None,
                Ok(secs) => cfg.timeout = Some(Duration::from_secs(secs)),
                Err(e) => tracing::warn!("Ignoring {ENV_TIMEOUT_SECS}={raw:?}: {e}"),
            }
        }
        cfg
    }

    /// Full URL of the classification route.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), PREDICT_PATH)
    }
}
