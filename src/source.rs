//! Statistics Sources
//!
//! Upstream boundary of the exporter. A source hands out a fresh
//! `StatsSnapshot` each time the registry is scraped.

use crate::top::StatsSnapshot;
use crate::Result;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::debug;

/// Supplies the current top statistics on demand
pub trait StatsSource: Send + Sync {
    fn snapshot(&self) -> Result<StatsSnapshot>;
}

/// In-memory source whose snapshot can be swapped between scrapes
#[derive(Debug, Default)]
pub struct StaticStatsSource {
    snapshot: RwLock<StatsSnapshot>,
}

impl StaticStatsSource {
    pub fn new(snapshot: StatsSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Replace the snapshot returned by subsequent calls
    pub fn replace(&self, snapshot: StatsSnapshot) -> Result<()> {
        let mut current = self
            .snapshot
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on snapshot"))?;
        *current = snapshot;
        Ok(())
    }
}

impl StatsSource for StaticStatsSource {
    fn snapshot(&self) -> Result<StatsSnapshot> {
        let current = self
            .snapshot
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on snapshot"))?;
        Ok(current.clone())
    }
}

/// Reads a captured `top` command reply from disk on every call
#[derive(Debug, Clone)]
pub struct FileStatsSource {
    path: PathBuf,
}

impl FileStatsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatsSource for FileStatsSource {
    fn snapshot(&self) -> Result<StatsSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot file: {}", self.path.display()))?;

        let snapshot = StatsSnapshot::from_top_response(&content)
            .with_context(|| format!("Failed to decode snapshot file: {}", self.path.display()))?;

        debug!(
            path = %self.path.display(),
            namespaces = snapshot.len(),
            "Loaded top statistics snapshot"
        );

        Ok(snapshot)
    }
}
