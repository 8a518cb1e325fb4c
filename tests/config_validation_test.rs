//! Configuration validation tests
//!
//! Tests that verify configuration defaults and validation.

use kubelet_volume_exporter::config::{
    parse_interval_seconds, Config, KubeletConfig, LoggingConfig, MetricsConfig, ServerConfig,
    DEFAULT_TOKEN_PATH,
};
use kubelet_volume_exporter::error::ExporterError;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_default_kubelet_config() {
    let config = KubeletConfig::default();

    assert_eq!(config.endpoint, "https://127.0.0.1:10250");
    assert_eq!(config.token_path, Some(PathBuf::from(DEFAULT_TOKEN_PATH)));
    assert!(!config.insecure_skip_tls_verify, "TLS verification on by default");
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
}

#[test]
fn test_default_server_config() {
    let config = ServerConfig::default();

    assert_eq!(config.addr, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert_eq!(config.shutdown_grace_period(), Duration::from_secs(5));
    assert!(!config.ready_requires_successful_scrape);
}

#[test]
fn test_default_metrics_and_logging_config() {
    assert_eq!(
        MetricsConfig::default().scrape_interval(),
        Duration::from_secs(30)
    );
    assert!(!LoggingConfig::default().debug);
}

#[test]
fn test_default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_partial_toml_falls_back_to_defaults() {
    let config: Config = config::Config::builder()
        .add_source(config::File::from_str(
            "[server]\nport = 9000\n",
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap()
        .try_deserialize()
        .expect("Failed to deserialize partial config");

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.addr, "0.0.0.0");
    assert_eq!(config.kubelet.endpoint, "https://127.0.0.1:10250");
    assert_eq!(config.metrics.scrape_interval_seconds, 30);
}

#[test]
fn test_invalid_endpoint_is_rejected() {
    let mut config = Config::default();
    config.kubelet.endpoint = "not a url".to_string();

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ExporterError::Config(_)));
    assert!(err.to_string().contains("Invalid kubelet endpoint"));
}

#[test]
fn test_non_http_endpoint_is_rejected() {
    let mut config = Config::default();
    config.kubelet.endpoint = "ftp://127.0.0.1:10250".to_string();

    assert!(matches!(config.validate(), Err(ExporterError::Config(_))));
}

#[test]
fn test_zero_intervals_are_rejected() {
    let mut config = Config::default();
    config.metrics.scrape_interval_seconds = 0;
    assert!(matches!(config.validate(), Err(ExporterError::Config(_))));

    let mut config = Config::default();
    config.kubelet.request_timeout_seconds = 0;
    assert!(matches!(config.validate(), Err(ExporterError::Config(_))));
}

#[test]
fn test_interval_parses_plain_seconds_and_durations() {
    assert_eq!(parse_interval_seconds("30"), Ok(30));
    assert_eq!(parse_interval_seconds("30s"), Ok(30));
    assert_eq!(parse_interval_seconds("1m"), Ok(60));
    assert_eq!(parse_interval_seconds(" 15s "), Ok(15));
}

#[test]
fn test_interval_rejects_zero_fractional_and_garbage() {
    assert!(parse_interval_seconds("0").is_err());
    assert!(parse_interval_seconds("0s").is_err());
    assert!(parse_interval_seconds("1500ms").is_err());
    assert!(parse_interval_seconds("soon").is_err());
}
