//! Metrics Types

use crate::top::OperationCategory;

/// Label names shared by both top metric families, in declaration order
pub const TOP_LABEL_NAMES: [&str; 3] = ["type", "database", "collection"];

/// The two metric families produced from top statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricFamilyKind {
    /// Operation time in seconds
    TimeSecondsTotal,
    /// Operation count
    CountTotal,
}

impl MetricFamilyKind {
    pub const ALL: [MetricFamilyKind; 2] = [
        MetricFamilyKind::TimeSecondsTotal,
        MetricFamilyKind::CountTotal,
    ];

    /// Metric name without the namespace prefix
    pub fn name(&self) -> &'static str {
        match self {
            MetricFamilyKind::TimeSecondsTotal => "top_time_seconds_total",
            MetricFamilyKind::CountTotal => "top_count_total",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            MetricFamilyKind::TimeSecondsTotal => {
                "The top command provides operation time, in seconds, for each database collection"
            }
            MetricFamilyKind::CountTotal => {
                "The top command provides operation count for each database collection"
            }
        }
    }
}

/// One labeled observation written into a metric family
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub family: MetricFamilyKind,
    pub category: OperationCategory,
    pub database: String,
    pub collection: String,
    pub value: f64,
}

impl MetricSample {
    /// Label values in `TOP_LABEL_NAMES` order
    pub fn label_values(&self) -> [&str; 3] {
        [self.category.as_str(), &self.database, &self.collection]
    }
}

/// Static shape of a metric family, advertised before any values exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    /// Fully-qualified name including the namespace prefix
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}
