//! Metrics Module
//!
//! Turns top statistics into Prometheus metric families and serves them.

pub mod collector;
pub mod types;
pub mod registry;
pub mod server;
pub mod manager;

pub use collector::{TopCollector, TopMetrics};
pub use registry::MetricsRegistry;
pub use server::MetricsServer;
pub use manager::MetricsManager;
pub use types::{MetricDescriptor, MetricFamilyKind, MetricSample, TOP_LABEL_NAMES};
