use crate::error::ExporterError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub kubelet: KubeletConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KubeletConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token file, re-read before every request.
    #[serde(default = "default_token_path")]
    pub token_path: Option<PathBuf>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_grace_period")]
    pub shutdown_grace_period_seconds: u64,
    /// When set, `/ready` answers 503 until the first successful scrape.
    #[serde(default)]
    pub ready_requires_successful_scrape: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Enables debug logging, including raw kubelet responses.
    #[serde(default)]
    pub debug: bool,
}

fn default_endpoint() -> String {
    "https://127.0.0.1:10250".to_string()
}

fn default_token_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_TOKEN_PATH))
}

fn default_request_timeout() -> u64 {
    10
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_grace_period() -> u64 {
    5
}

fn default_scrape_interval() -> u64 {
    30
}

impl Default for KubeletConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token_path: default_token_path(),
            insecure_skip_tls_verify: false,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            shutdown_grace_period_seconds: default_grace_period(),
            ready_requires_successful_scrape: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            scrape_interval_seconds: default_scrape_interval(),
        }
    }
}

impl KubeletConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl ServerConfig {
    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_period_seconds)
    }
}

impl MetricsConfig {
    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_seconds)
    }
}

/// Parse a poll interval given as seconds (`30`) or a duration (`30s`, `2m`)
///
/// Durations must be whole, non-zero seconds.
pub fn parse_interval_seconds(value: &str) -> std::result::Result<u64, String> {
    let value = value.trim();
    let seconds = match value.parse::<u64>() {
        Ok(seconds) => seconds,
        Err(_) => {
            let duration = humantime::parse_duration(value)
                .map_err(|e| format!("invalid interval '{}': {}", value, e))?;
            if duration.subsec_nanos() != 0 {
                return Err(format!(
                    "invalid interval '{}': must be a whole number of seconds",
                    value
                ));
            }
            duration.as_secs()
        }
    };
    if seconds == 0 {
        return Err(format!("invalid interval '{}': must be greater than zero", value));
    }
    Ok(seconds)
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("KUBELET_VOLUME_EXPORTER").separator("__"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Rejects settings the exporter cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ExporterError> {
        let endpoint = reqwest::Url::parse(&self.kubelet.endpoint).map_err(|e| {
            ExporterError::Config(format!(
                "Invalid kubelet endpoint '{}': {}",
                self.kubelet.endpoint, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ExporterError::Config(format!(
                "Kubelet endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        if self.metrics.scrape_interval_seconds == 0 {
            return Err(ExporterError::Config(
                "scrape_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.kubelet.request_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "request_timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
