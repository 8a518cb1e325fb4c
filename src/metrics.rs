//! Prometheus Metrics Definitions
//!
//! This module owns the exporter's metrics registry and the observation set
//! republished from the kubelet.
//!
//! # Metric Families
//!
//! ## Volume stats (labelled `namespace`, `persistentvolumeclaim`, `pod`)
//! - `kubelet_volume_stats_capacity_bytes`
//! - `kubelet_volume_stats_available_bytes`
//! - `kubelet_volume_stats_used_bytes`
//! - `kubelet_volume_stats_inodes`
//! - `kubelet_volume_stats_inodes_free`
//! - `kubelet_volume_stats_inodes_used`
//!
//! ## Exporter health (unlabelled)
//! - `kubelet_volume_stats_scrape_errors_total` - Counter of failed polls
//! - `kubelet_volume_stats_last_scrape_timestamp_seconds` - Last successful poll
//!
//! # Snapshot Semantics
//!
//! Volume stats are held as one immutable [`ObservationSet`] behind an
//! [`ArcSwap`]. A successful poll swaps in a complete new set, so a scrape
//! renders either the previous set or the next one and never a mix. Label
//! combinations missing from the new set disappear from the output.
//!
//! Values are exported as `f64`; byte counts above 2^53 lose precision.

use arc_swap::ArcSwap;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

const NAMESPACE: &str = "kubelet";
const SUBSYSTEM: &str = "volume_stats";

/// Label names attached to every volume observation, in label-value order
pub const VOLUME_LABELS: [&str; 3] = ["namespace", "persistentvolumeclaim", "pod"];

/// One of the six per-volume quantities republished from the kubelet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    CapacityBytes,
    AvailableBytes,
    UsedBytes,
    Inodes,
    InodesFree,
    InodesUsed,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::CapacityBytes,
        MetricKind::AvailableBytes,
        MetricKind::UsedBytes,
        MetricKind::Inodes,
        MetricKind::InodesFree,
        MetricKind::InodesUsed,
    ];

    /// Metric name without the `kubelet_volume_stats_` prefix
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::CapacityBytes => "capacity_bytes",
            MetricKind::AvailableBytes => "available_bytes",
            MetricKind::UsedBytes => "used_bytes",
            MetricKind::Inodes => "inodes",
            MetricKind::InodesFree => "inodes_free",
            MetricKind::InodesUsed => "inodes_used",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            MetricKind::CapacityBytes => "Capacity in bytes of the volume",
            MetricKind::AvailableBytes => "Number of available bytes in the volume",
            MetricKind::UsedBytes => "Number of used bytes in the volume",
            MetricKind::Inodes => "Maximum number of inodes in the volume",
            MetricKind::InodesFree => "Number of free inodes in the volume",
            MetricKind::InodesUsed => "Number of used inodes in the volume",
        }
    }

    fn opts(self) -> Opts {
        Opts::new(self.name(), self.help())
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM)
    }
}

/// Label set identifying one volume series
///
/// `namespace` and `pod` always describe the pod consuming the volume.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
    pub namespace: String,
    pub persistentvolumeclaim: String,
    pub pod: String,
}

impl ObservationKey {
    pub fn new(
        namespace: impl Into<String>,
        persistentvolumeclaim: impl Into<String>,
        pod: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            persistentvolumeclaim: persistentvolumeclaim.into(),
            pod: pod.into(),
        }
    }

    fn label_values(&self) -> [&str; 3] {
        [
            self.namespace.as_str(),
            self.persistentvolumeclaim.as_str(),
            self.pod.as_str(),
        ]
    }
}

/// Complete set of volume observations produced by one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSet {
    values: BTreeMap<(MetricKind, ObservationKey), f64>,
}

impl ObservationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation, returning the value it replaced
    pub fn insert(&mut self, kind: MetricKind, key: ObservationKey, value: f64) -> Option<f64> {
        self.values.insert((kind, key), value)
    }

    pub fn get(&self, kind: MetricKind, key: &ObservationKey) -> Option<f64> {
        // BTreeMap lookups need an owned tuple key.
        self.values.get(&(kind, key.clone())).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &ObservationKey, f64)> {
        self.values
            .iter()
            .map(|((kind, key), value)| (*kind, key, *value))
    }

    /// Number of observations of a single kind
    pub fn count(&self, kind: MetricKind) -> usize {
        self.values.keys().filter(|(k, _)| *k == kind).count()
    }
}

/// Renders the current [`ObservationSet`] as six gauge families
///
/// Registered once; every `collect` loads a single snapshot and builds fresh
/// gauge vectors from it.
struct ObservationCollector {
    observations: Arc<ArcSwap<ObservationSet>>,
    templates: Vec<(MetricKind, GaugeVec)>,
}

impl ObservationCollector {
    fn new(observations: Arc<ArcSwap<ObservationSet>>) -> anyhow::Result<Self> {
        let templates = MetricKind::ALL
            .iter()
            .map(|kind| Ok((*kind, GaugeVec::new(kind.opts(), &VOLUME_LABELS)?)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            observations,
            templates,
        })
    }
}

impl Collector for ObservationCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.templates
            .iter()
            .flat_map(|(_, template)| template.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.observations.load();

        let mut gauges = BTreeMap::new();
        for (kind, _) in &self.templates {
            match GaugeVec::new(kind.opts(), &VOLUME_LABELS) {
                Ok(gauge) => {
                    gauges.insert(*kind, gauge);
                }
                Err(e) => warn!("Failed to build {} gauge: {}", kind.name(), e),
            }
        }

        for (kind, key, value) in snapshot.iter() {
            if let Some(gauge) = gauges.get(&kind) {
                gauge.with_label_values(&key.label_values()).set(value);
            }
        }

        gauges.values().flat_map(|gauge| gauge.collect()).collect()
    }
}

/// Metrics registry for the exporter
///
/// Cheap to clone; all clones share the same registry and snapshot.
#[derive(Clone)]
pub struct VolumeMetrics {
    registry: Arc<Registry>,
    observations: Arc<ArcSwap<ObservationSet>>,

    pub scrape_errors_total: Arc<IntCounter>,
    pub last_scrape_timestamp_seconds: Arc<Gauge>,
}

impl VolumeMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let observations = Arc::new(ArcSwap::from_pointee(ObservationSet::new()));

        let scrape_errors_total = IntCounter::with_opts(
            Opts::new(
                "scrape_errors_total",
                "Total number of errors while scraping kubelet stats",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM),
        )?;

        let last_scrape_timestamp_seconds = Gauge::with_opts(
            Opts::new(
                "last_scrape_timestamp_seconds",
                "Timestamp of the last successful scrape",
            )
            .namespace(NAMESPACE)
            .subsystem(SUBSYSTEM),
        )?;

        registry.register(Box::new(ObservationCollector::new(observations.clone())?))?;
        registry.register(Box::new(scrape_errors_total.clone()))?;
        registry.register(Box::new(last_scrape_timestamp_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            observations,
            scrape_errors_total: Arc::new(scrape_errors_total),
            last_scrape_timestamp_seconds: Arc::new(last_scrape_timestamp_seconds),
        })
    }

    /// Swap in a new observation set, dropping every series not present in it
    pub fn replace_observations(&self, observations: ObservationSet) {
        self.observations.store(Arc::new(observations));
    }

    /// Current observation set
    pub fn observations(&self) -> Arc<ObservationSet> {
        self.observations.load_full()
    }

    pub fn record_scrape_error(&self) {
        self.scrape_errors_total.inc();
    }

    /// Set the last-scrape timestamp to the current wall clock time
    pub fn record_scrape_success(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.last_scrape_timestamp_seconds.set(now);
    }

    /// Whether at least one poll has completed successfully
    pub fn has_successful_scrape(&self) -> bool {
        self.last_scrape_timestamp_seconds.get() > 0.0
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
