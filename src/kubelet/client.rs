//! Kubelet Stats API Client
//!
//! Fetches the node summary from the kubelet's read-only stats API.
//!
//! # Authentication
//!
//! The kubelet expects a service-account bearer token. The token file is read
//! again before every request, so a rotated token is picked up without a
//! restart. An unreadable or empty file degrades to an unauthenticated request;
//! that is logged at warn once, then at debug until a token is read again.
//!
//! # Example
//!
//! ```no_run
//! use kubelet_volume_exporter::config::KubeletConfig;
//! use kubelet_volume_exporter::kubelet::KubeletClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = KubeletConfig {
//!     endpoint: "https://127.0.0.1:10250".to_string(),
//!     token_path: None,
//!     insecure_skip_tls_verify: true,
//!     request_timeout_seconds: 10,
//! };
//!
//! let client = KubeletClient::new(config)?;
//! let summary = client.query_summary().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::KubeletConfig;
use crate::error::{ExporterError, Result};
use crate::kubelet::types::Summary;
use bytes::Bytes;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

const SUMMARY_PATH: &str = "/stats/summary";

/// Client for the kubelet `/stats/summary` endpoint
///
/// Cheap to share behind an `Arc`; the underlying `reqwest::Client` pools
/// connections between polls.
pub struct KubeletClient {
    http: reqwest::Client,
    config: KubeletConfig,
    summary_url: String,
    /// Set while the token file is unusable and that has already been warned about
    token_unavailable: AtomicBool,
}

impl KubeletClient {
    pub fn new(config: KubeletConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout());

        if config.insecure_skip_tls_verify {
            warn!("TLS certificate verification for the kubelet is disabled");
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let http = builder.build()?;
        let summary_url = format!(
            "{}{}",
            config.endpoint.trim_end_matches('/'),
            SUMMARY_PATH
        );

        Ok(Self {
            http,
            config,
            summary_url,
            token_unavailable: AtomicBool::new(false),
        })
    }

    /// Full URL polled on every collection
    pub fn summary_url(&self) -> &str {
        &self.summary_url
    }

    /// Configured kubelet endpoint, for log context
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Fetch the raw summary document
    ///
    /// Returns the body on HTTP 200. Any other status becomes
    /// [`ExporterError::UpstreamStatus`]; network, timeout and TLS failures
    /// become [`ExporterError::Transport`].
    pub async fn fetch_summary(&self) -> Result<Bytes> {
        debug!("Fetching stats from kubelet: {}", self.summary_url);

        let mut request = self.http.get(&self.summary_url);
        if let Some(token) = self.read_token().await {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();

        // The caller logs the error, body included
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ExporterError::UpstreamStatus {
                code: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        debug!("Raw kubelet API response ({} bytes)", body.len());
        debug!("{}", String::from_utf8_lossy(&body));

        Ok(body)
    }

    /// Fetch and decode the summary document
    pub async fn query_summary(&self) -> Result<Summary> {
        let body = self.fetch_summary().await?;
        let summary = Summary::from_slice(&body)?;
        debug!(
            "Parsed stats summary for node '{}' ({} pods)",
            summary.node.node_name,
            summary.pods.len()
        );
        Ok(summary)
    }

    async fn read_token(&self) -> Option<SecretString> {
        let path = self.config.token_path.as_deref()?;
        if path.as_os_str().is_empty() {
            return None;
        }

        let problem = match read_token_file(path).await {
            Ok(Some(token)) => {
                if self.token_unavailable.swap(false, Ordering::Relaxed) {
                    debug!("Service account token at {} is readable again", path.display());
                }
                return Some(token);
            }
            Ok(None) => "token file is empty".to_string(),
            Err(e) => e.to_string(),
        };

        if self.token_unavailable.swap(true, Ordering::Relaxed) {
            debug!(
                "No service account token at {} ({}), request is unauthenticated",
                path.display(),
                problem
            );
        } else {
            warn!(
                "Failed to read service account token from {}, proceeding without authentication: {}",
                path.display(),
                problem
            );
        }
        None
    }
}

/// Read a bearer token; a blank file yields `None`
async fn read_token_file(path: &Path) -> std::io::Result<Option<SecretString>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let token = contents.trim();
    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(SecretString::from(token.to_string())))
    }
}
