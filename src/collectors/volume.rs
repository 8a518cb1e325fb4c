//! Volume Stats Collector
//!
//! Republishes PVC-backed volume figures from the kubelet summary.
//!
//! # Metrics Produced
//! - `kubelet_volume_stats_capacity_bytes` - `capacityBytes`
//! - `kubelet_volume_stats_available_bytes` - `availableBytes`
//! - `kubelet_volume_stats_used_bytes` - `usedBytes`
//! - `kubelet_volume_stats_inodes` - `inodes`
//! - `kubelet_volume_stats_inodes_free` - `inodesFree`
//! - `kubelet_volume_stats_inodes_used` - `inodesUsed`
//!
//! All labelled `namespace`, `persistentvolumeclaim`, `pod`. Namespace and pod
//! come from the pod reference, not from the PVC reference.
//!
//! Volumes without a PVC reference are skipped. A missing field omits only
//! its own metric. When two volumes map to the same label set, the one seen
//! last wins.

use super::{collect_with_handler, CollectionContext, CollectionStatus};
use crate::kubelet::types::{PodStats, Summary, VolumeStats};
use crate::metrics::{MetricKind, ObservationKey, ObservationSet};
use tracing::debug;

/// Counts gathered while projecting one summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    pub pods_with_pvc_volumes: usize,
    pub volumes_projected: usize,
    pub volumes_skipped: usize,
}

fn volume_values(volume: &VolumeStats) -> [(MetricKind, Option<u64>); 6] {
    [
        (MetricKind::CapacityBytes, volume.capacity_bytes),
        (MetricKind::AvailableBytes, volume.available_bytes),
        (MetricKind::UsedBytes, volume.used_bytes),
        (MetricKind::Inodes, volume.inodes_total),
        (MetricKind::InodesFree, volume.inodes_free),
        (MetricKind::InodesUsed, volume.inodes_used),
    ]
}

fn project_pod(pod: &PodStats, observations: &mut ObservationSet, stats: &mut ProjectionStats) {
    let mut projected_any = false;

    for volume in &pod.volumes {
        let pvc_name = match &volume.pvc_ref {
            Some(pvc) if !pvc.name.is_empty() => pvc.name.as_str(),
            _ => {
                debug!(
                    "Skipping volume without PVC reference: {} (pod {}/{})",
                    volume.name, pod.pod_ref.namespace, pod.pod_ref.name
                );
                stats.volumes_skipped += 1;
                continue;
            }
        };

        let key = ObservationKey::new(&pod.pod_ref.namespace, pvc_name, &pod.pod_ref.name);
        for (kind, value) in volume_values(volume) {
            if let Some(value) = value {
                observations.insert(kind, key.clone(), value as f64);
            }
        }

        debug!(
            "Updated metrics for volume {} (namespace={}, pod={}, pvc={})",
            volume.name, pod.pod_ref.namespace, pod.pod_ref.name, pvc_name
        );
        stats.volumes_projected += 1;
        projected_any = true;
    }

    if projected_any {
        stats.pods_with_pvc_volumes += 1;
    }
}

/// Project a kubelet summary into the observation set to publish
///
/// Pure: the summary is only read, and the returned set is meant to replace
/// the published one wholesale.
pub fn project_volume_stats(summary: &Summary) -> ObservationSet {
    project_volume_stats_with_stats(summary).0
}

/// Same as [`project_volume_stats`], also reporting what was projected
pub fn project_volume_stats_with_stats(summary: &Summary) -> (ObservationSet, ProjectionStats) {
    let mut observations = ObservationSet::new();
    let mut stats = ProjectionStats::default();

    for pod in &summary.pods {
        project_pod(pod, &mut observations, &mut stats);
    }

    (observations, stats)
}

/// Poll the kubelet once and publish the projected observations
///
/// # Returns
///
/// * `CollectionStatus::Success` - Observations replaced, timestamp updated
/// * `CollectionStatus::Failed` - Error logged and counted, observations untouched
pub async fn collect_volume_metrics(ctx: &CollectionContext<'_>) -> CollectionStatus {
    collect_with_handler(
        ctx.client.endpoint(),
        ctx.metrics,
        ctx.client.query_summary(),
        |summary| {
            let (observations, stats) = project_volume_stats_with_stats(&summary);
            debug!(
                "Metrics update completed: {} pods with PVC volumes, {} volumes processed, {} skipped",
                stats.pods_with_pvc_volumes, stats.volumes_projected, stats.volumes_skipped
            );
            ctx.metrics.replace_observations(observations);
        },
    )
    .await
}
