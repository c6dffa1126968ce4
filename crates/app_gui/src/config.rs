use mri_core::ClientConfig;
use std::path::PathBuf;

pub const ENV_SAMPLES_DIR: &str = "NEUROSCAN_SAMPLES_DIR";
const DEFAULT_SAMPLES_DIR: &str = "samples";

/// Startup configuration; the endpoint part is handed to the core client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub samples_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::with_samples_dir(ClientConfig::from_env(), std::env::var(ENV_SAMPLES_DIR).ok())
    }

    fn with_samples_dir(client: ClientConfig, samples_dir: Option<String>) -> Self {
        let samples_dir = samples_dir
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SAMPLES_DIR.to_string());
        Self {
            client,
            samples_dir: PathBuf::from(samples_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "samples")]
    #[case(Some(""), "samples")]
    #[case(Some(" /opt/neuroscan/samples "), "/opt/neuroscan/samples")]
    fn samples_dir_defaults_when_unset(#[case] raw: Option<&str>, #[case] expected: &str) {
        let cfg = AppConfig::with_samples_dir(ClientConfig::default(), raw.map(str::to_string));
        assert_eq!(cfg.samples_dir, PathBuf::from(expected));
    }
}
