//! Kubelet Volume Stats Exporter
//!
//! Republishes PersistentVolumeClaim capacity and inode figures from the
//! kubelet's `/stats/summary` API as the `kubelet_volume_stats_*` Prometheus
//! metrics, for clusters where the kubelet no longer exports them itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   GET /stats/summary  ┌──────────────┐
//! │   Kubelet   │ ◄──────────────────── │   Exporter   │
//! │   :10250    │     bearer token      │              │
//! └─────────────┘                       │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                       │  │ Client │  │ ◄────────────► │ Prometheus │
//!                                       │  └────────┘  │   /metrics     └────────────┘
//!                                       │  ┌────────┐  │
//!                                       │  │Metrics │  │
//!                                       │  └────────┘  │
//!                                       └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`kubelet`] - Stats API client and summary type definitions
//! - [`collectors`] - Projection of summaries into volume observations
//! - [`metrics`] - Prometheus registry and observation snapshot
//! - [`server`] - HTTP server and collection loop
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use kubelet_volume_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod kubelet;
pub mod metrics;
pub mod server;
