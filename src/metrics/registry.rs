//! Metrics Registry
//!
//! Owns the Prometheus registry and the top metric families. Constructed once
//! at startup and shared by reference with the scrape server.

use super::{MetricDescriptor, TopCollector, TopMetrics};
use crate::source::StatsSource;
use crate::Result;
use anyhow::Context;
use prometheus::proto::MetricFamily;
use prometheus::{Registry, TextEncoder};
use std::sync::Arc;
use tracing::{error, info};

pub struct MetricsRegistry {
    prometheus_registry: Registry,
    top: Arc<TopMetrics>,
}

impl MetricsRegistry {
    /// Create a registry whose top families live under `namespace`
    pub fn new(namespace: &str) -> Result<Self> {
        let top = Arc::new(TopMetrics::new(namespace)?);

        Ok(Self {
            prometheus_registry: Registry::new(),
            top,
        })
    }

    /// Register the source that feeds the top families on every scrape.
    ///
    /// Only one source can be registered; a second call fails because the
    /// family descriptors are already taken.
    pub fn register_source(&self, source: Arc<dyn StatsSource>) -> Result<()> {
        let collector = TopCollector::new(self.top.clone(), source);
        self.prometheus_registry
            .register(Box::new(collector))
            .context("Failed to register top statistics collector")?;

        info!("Registered top statistics collector");
        Ok(())
    }

    pub fn describe(&self) -> Vec<MetricDescriptor> {
        self.top.describe()
    }

    /// Collect every registered family, pulling a fresh snapshot
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.prometheus_registry.gather()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}
