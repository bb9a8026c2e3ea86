//! Top Metrics Collector
//!
//! Flattens a `StatsSnapshot` into the `top_time_seconds_total` and
//! `top_count_total` families. Values are set, not accumulated, so each export
//! reflects the latest snapshot. Label-sets of namespaces that disappear from
//! later snapshots keep their last value.

use super::{MetricDescriptor, MetricFamilyKind, MetricSample, TOP_LABEL_NAMES};
use crate::source::StatsSource;
use crate::top::{Namespace, OperationCategory, StatsSnapshot};
use crate::Result;
use anyhow::Context;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

/// The two top metric families, created once and mutated on every export
pub struct TopMetrics {
    time_seconds_total: GaugeVec,
    count_total: GaugeVec,
    // Serializes export passes against each other and against collection
    export_lock: Mutex<()>,
}

impl TopMetrics {
    /// Create both families under the given namespace prefix
    pub fn new(namespace: &str) -> Result<Self> {
        let time_seconds_total = Self::family(namespace, MetricFamilyKind::TimeSecondsTotal)?;
        let count_total = Self::family(namespace, MetricFamilyKind::CountTotal)?;

        Ok(Self {
            time_seconds_total,
            count_total,
            export_lock: Mutex::new(()),
        })
    }

    fn family(namespace: &str, kind: MetricFamilyKind) -> Result<GaugeVec> {
        let opts = Opts::new(kind.name(), kind.help()).namespace(namespace);
        GaugeVec::new(opts, &TOP_LABEL_NAMES)
            .with_context(|| format!("Failed to create {} metric family", kind.name()))
    }

    fn vec(&self, kind: MetricFamilyKind) -> &GaugeVec {
        match kind {
            MetricFamilyKind::TimeSecondsTotal => &self.time_seconds_total,
            MetricFamilyKind::CountTotal => &self.count_total,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state
        self.export_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn descs(&self) -> Vec<&Desc> {
        let mut descs = self.time_seconds_total.desc();
        descs.extend(self.count_total.desc());
        descs
    }

    /// Static descriptors of both families; independent of any snapshot
    pub fn describe(&self) -> Vec<MetricDescriptor> {
        self.descs()
            .into_iter()
            .map(|desc| MetricDescriptor {
                name: desc.fq_name.clone(),
                help: desc.help.clone(),
                label_names: desc.variable_labels.clone(),
            })
            .collect()
    }

    /// Turn a snapshot into labeled samples without touching the families.
    ///
    /// Namespaces are visited in sorted order and categories in
    /// `OperationCategory::ALL` order, each yielding a time sample followed by
    /// a count sample.
    pub fn flatten(snapshot: &StatsSnapshot) -> Vec<MetricSample> {
        let mut namespaces: Vec<_> = snapshot.iter().collect();
        namespaces.sort_by(|a, b| a.0.cmp(b.0));

        let mut samples = Vec::with_capacity(namespaces.len() * OperationCategory::ALL.len() * 2);

        for (namespace, stats) in namespaces {
            let Namespace { database, collection } = Namespace::split(namespace);

            for category in OperationCategory::ALL {
                let counter = category.counter(stats);

                samples.push(MetricSample {
                    family: MetricFamilyKind::TimeSecondsTotal,
                    category,
                    database: database.clone(),
                    collection: collection.clone(),
                    value: counter.seconds(),
                });
                samples.push(MetricSample {
                    family: MetricFamilyKind::CountTotal,
                    category,
                    database: database.clone(),
                    collection: collection.clone(),
                    value: counter.count,
                });
            }
        }

        samples
    }

    /// Flatten the snapshot and set every sample into its family.
    ///
    /// Returns the samples written by this call; an empty snapshot writes
    /// nothing and leaves earlier values in place.
    pub fn export(&self, snapshot: &StatsSnapshot) -> Vec<MetricSample> {
        let samples = Self::flatten(snapshot);

        let _guard = self.lock();
        for sample in &samples {
            self.vec(sample.family)
                .with_label_values(&sample.label_values())
                .set(sample.value);
        }

        debug!(
            namespaces = snapshot.len(),
            samples = samples.len(),
            "Exported top statistics"
        );

        samples
    }

    /// Current contents of both families
    pub fn collect(&self) -> Vec<MetricFamily> {
        let _guard = self.lock();
        let mut families = self.time_seconds_total.collect();
        families.extend(self.count_total.collect());
        families
    }

    /// Current value of one label-set, if it has ever been exported
    pub fn value(
        &self,
        family: MetricFamilyKind,
        category: OperationCategory,
        database: &str,
        collection: &str,
    ) -> Option<f64> {
        let wanted = [
            (TOP_LABEL_NAMES[0], category.as_str()),
            (TOP_LABEL_NAMES[1], database),
            (TOP_LABEL_NAMES[2], collection),
        ];

        let _guard = self.lock();
        self.vec(family)
            .collect()
            .iter()
            .flat_map(|mf| mf.get_metric())
            .find(|metric| {
                wanted.iter().all(|(name, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *name && pair.get_value() == *value)
                })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of label-sets currently held by a family
    pub fn series_count(&self, family: MetricFamilyKind) -> usize {
        let _guard = self.lock();
        self.vec(family)
            .collect()
            .iter()
            .map(|mf| mf.get_metric().len())
            .sum()
    }

    /// Drop every label-set from both families
    pub fn reset(&self) {
        let _guard = self.lock();
        self.time_seconds_total.reset();
        self.count_total.reset();
    }
}

/// Pull-time collector: every scrape fetches a fresh snapshot from the source
/// and exports it before the families are collected
pub struct TopCollector {
    metrics: Arc<TopMetrics>,
    source: Arc<dyn StatsSource>,
}

impl TopCollector {
    pub fn new(metrics: Arc<TopMetrics>, source: Arc<dyn StatsSource>) -> Self {
        Self { metrics, source }
    }
}

impl Collector for TopCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.metrics.descs()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self.source.snapshot() {
            Ok(snapshot) => {
                self.metrics.export(&snapshot);
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch top statistics, serving previous values");
            }
        }

        self.metrics.collect()
    }
}
