//! TopExporter Library
//!
//! Exposes MongoDB per-collection `top` statistics as Prometheus metrics.
//! Each scrape pulls a fresh statistics snapshot and flattens it into the
//! `top_time_seconds_total` and `top_count_total` families, labelled by
//! operation type, database and collection.

pub mod config;
pub mod metrics;
pub mod shutdown;
pub mod source;
pub mod top;

pub use config::Config;
pub use metrics::{MetricsRegistry, TopMetrics};
pub use shutdown::ShutdownCoordinator;
pub use source::{FileStatsSource, StaticStatsSource, StatsSource};
pub use top::{CollectionStats, Namespace, OperationCategory, OperationCounter, StatsSnapshot};

/// Common error type for the exporter
pub type Result<T> = anyhow::Result<T>;
