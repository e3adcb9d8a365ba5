//! Client configuration, read from TOML with environment overrides.
//!
//! ```toml
//! base_url = "https://api.example.com/inspections/negotiations"
//! request_timeout_secs = 30
//!
//! [retry]
//! max_retries = 2
//! initial_delay_ms = 500
//! ```
use super::error::ConfigError;
use super::retry::RetryPolicy;
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "NEGOTIATION_API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "NEGOTIATION_API_TIMEOUT_SECS";

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("inspection-negotiation/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter_factor: 0.25,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter_factor: self.jitter_factor,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            request_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            retry: RetrySettings::default(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, PathBuf::from("<inline>"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path.to_path_buf())
    }

    fn parse(content: &str, path: PathBuf) -> Result<Self, ConfigError> {
        let mut config: ClientConfig =
            toml::from_str(content).map_err(|source| ConfigError::Parse { path, source })?;
        config.base_url = normalize_base_url(&config.base_url)?;
        Ok(config)
    }

    /// Applies `NEGOTIATION_API_BASE_URL` and `NEGOTIATION_API_TIMEOUT_SECS`.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = normalize_base_url(&base_url)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: ENV_TIMEOUT_SECS,
                        value: raw.clone(),
                    })?;
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parses the base url, requiring http(s) and a host. The trailing slash is
/// dropped so routes can be appended as path segments.
fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|_| ConfigError::InvalidBaseUrl(raw.to_string()))?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
