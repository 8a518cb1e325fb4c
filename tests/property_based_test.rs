//! Property-based tests using proptest
//!
//! Tests that verify projection properties hold for arbitrary summaries.

use kubelet_volume_exporter::collectors::project_volume_stats;
use kubelet_volume_exporter::kubelet::types::*;
use kubelet_volume_exporter::metrics::{MetricKind, ObservationKey, VolumeMetrics};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn arb_quantity() -> impl Strategy<Value = Option<u64>> {
    prop::option::of(any::<u64>())
}

fn arb_volume() -> impl Strategy<Value = VolumeStats> {
    (
        "[a-z]{1,8}",
        prop::option::of(("[a-z][a-z0-9-]{0,10}", "[a-z]{1,8}")),
        prop::array::uniform6(arb_quantity()),
    )
        .prop_map(|(name, pvc, q)| VolumeStats {
            name,
            pvc_ref: pvc.map(|(name, namespace)| PvcReference { name, namespace }),
            capacity_bytes: q[0],
            used_bytes: q[1],
            available_bytes: q[2],
            inodes_total: q[3],
            inodes_free: q[4],
            inodes_used: q[5],
        })
}

fn arb_pod() -> impl Strategy<Value = PodStats> {
    (
        "[a-z]{1,8}",
        "[a-z]{1,8}",
        prop::collection::vec(arb_volume(), 0..5),
    )
        .prop_map(|(namespace, name, volumes)| PodStats {
            pod_ref: PodReference {
                uid: format!("{}-{}", namespace, name),
                name,
                namespace,
            },
            volumes,
            ephemeral_storage: None,
        })
}

fn arb_summary() -> impl Strategy<Value = Summary> {
    prop::collection::vec(arb_pod(), 0..6).prop_map(|pods| Summary {
        pods,
        ..Default::default()
    })
}

fn present_kinds(volume: &VolumeStats) -> Vec<(MetricKind, u64)> {
    [
        (MetricKind::CapacityBytes, volume.capacity_bytes),
        (MetricKind::AvailableBytes, volume.available_bytes),
        (MetricKind::UsedBytes, volume.used_bytes),
        (MetricKind::Inodes, volume.inodes_total),
        (MetricKind::InodesFree, volume.inodes_free),
        (MetricKind::InodesUsed, volume.inodes_used),
    ]
    .into_iter()
    .filter_map(|(kind, value)| value.map(|v| (kind, v)))
    .collect()
}

proptest! {
    #[test]
    fn test_observations_match_last_writer(summary in arb_summary()) {
        // Given: an arbitrary summary
        // When: Projecting it
        let observations = project_volume_stats(&summary);

        // Then: replaying the volumes in order gives the same map
        let mut expected = std::collections::BTreeMap::new();
        for pod in &summary.pods {
            for volume in &pod.volumes {
                if let Some(pvc) = &volume.pvc_ref {
                    let key = ObservationKey::new(&pod.pod_ref.namespace, &pvc.name, &pod.pod_ref.name);
                    for (kind, value) in present_kinds(volume) {
                        expected.insert((kind, key.clone()), value as f64);
                    }
                }
            }
        }

        prop_assert_eq!(observations.len(), expected.len());
        for ((kind, key), value) in &expected {
            prop_assert_eq!(observations.get(*kind, key), Some(*value));
        }
    }

    #[test]
    fn test_labels_only_use_pod_identity(summary in arb_summary()) {
        let observations = project_volume_stats(&summary);

        let pod_identities: BTreeSet<(String, String)> = summary
            .pods
            .iter()
            .map(|pod| (pod.pod_ref.namespace.clone(), pod.pod_ref.name.clone()))
            .collect();

        for (_, key, _) in observations.iter() {
            prop_assert!(!key.persistentvolumeclaim.is_empty());
            prop_assert!(pod_identities.contains(&(key.namespace.clone(), key.pod.clone())));
        }
    }

    #[test]
    fn test_volumes_without_pvc_never_publish(summary in arb_summary()) {
        let mut stripped = summary.clone();
        for pod in &mut stripped.pods {
            for volume in &mut pod.volumes {
                volume.pvc_ref = None;
            }
        }

        prop_assert!(project_volume_stats(&stripped).is_empty());
    }

    #[test]
    fn test_any_label_values_render_without_panic(
        namespace in "\\PC*",
        pvc in "\\PC+",
        pod in "\\PC*",
        value in any::<u64>()
    ) {
        let metrics = VolumeMetrics::new().unwrap();
        let summary = Summary {
            pods: vec![PodStats {
                pod_ref: PodReference { name: pod, namespace, uid: String::new() },
                volumes: vec![VolumeStats {
                    name: "v".to_string(),
                    pvc_ref: Some(PvcReference { name: pvc, namespace: String::new() }),
                    used_bytes: Some(value),
                    ..Default::default()
                }],
                ephemeral_storage: None,
            }],
            ..Default::default()
        };

        metrics.replace_observations(project_volume_stats(&summary));

        let result = metrics.render();
        prop_assert!(result.is_ok());
    }
}
