//! Metrics Collectors
//!
//! A collection is one poll of the kubelet: fetch the stats summary, decode it,
//! project it into observations and publish them to [`VolumeMetrics`].
//!
//! # Error Handling
//!
//! Failures never propagate out of a collection. They are logged with the
//! kubelet endpoint, counted in `kubelet_volume_stats_scrape_errors_total`, and
//! the previously published observations stay in place until the next tick.

use crate::kubelet::KubeletClient;
use crate::metrics::VolumeMetrics;
use tracing::{debug, error};

/// Shared context passed to collectors
///
/// All fields are immutable references, so no invariants can be violated.
#[derive(Clone, Copy)]
pub struct CollectionContext<'a> {
    /// Kubelet API client
    pub client: &'a KubeletClient,
    /// Registry receiving the projected observations
    pub metrics: &'a VolumeMetrics,
}

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Metrics were successfully collected and published
    Success,
    /// Collection failed; already logged and counted
    Failed,
}

/// Run a query and hand its result to `process`
///
/// - On success: processes data, records the scrape timestamp, returns `Success`
/// - On error: logs with endpoint context, bumps the error counter, returns `Failed`
///
/// # Arguments
///
/// * `endpoint` - Kubelet endpoint, for log context
/// * `metrics` - Registry whose scrape counters are updated
/// * `query_future` - Async API call that returns data
/// * `process` - Function publishing the data
pub async fn collect_with_handler<T, F, P, E>(
    endpoint: &str,
    metrics: &VolumeMetrics,
    query_future: F,
    process: P,
) -> CollectionStatus
where
    F: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match query_future.await {
        Ok(data) => {
            process(data);
            metrics.record_scrape_success();
            debug!("Volume stats collection completed");
            CollectionStatus::Success
        }
        Err(e) => {
            error!("Failed to fetch stats from {}: {}", endpoint, e);
            metrics.record_scrape_error();
            CollectionStatus::Failed
        }
    }
}

pub mod volume;

pub use volume::{collect_volume_metrics, project_volume_stats};
