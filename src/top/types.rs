//! Top Statistics Types

use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::hash_map;
use std::collections::HashMap;

/// Separator between the database and collection parts of a namespace
pub const NAMESPACE_SEPARATOR: char = '.';

// Server reply fields such as `$clusterTime`; never a valid database name
const REPLY_METADATA_PREFIX: char = '$';

/// Cumulative time and invocation count for one operation category
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperationCounter {
    /// Elapsed time in microseconds
    pub time: f64,
    pub count: f64,
}

impl OperationCounter {
    pub fn new(time: f64, count: f64) -> Self {
        Self { time, count }
    }

    /// Elapsed time converted to seconds
    pub fn seconds(&self) -> f64 {
        self.time / 1e6
    }
}

/// Operation counters for a single collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectionStats {
    pub total: OperationCounter,
    pub read_lock: OperationCounter,
    pub write_lock: OperationCounter,
    pub queries: OperationCounter,
    #[serde(rename = "getmore")]
    pub get_more: OperationCounter,
    pub insert: OperationCounter,
    pub update: OperationCounter,
    pub remove: OperationCounter,
    pub commands: OperationCounter,
}

/// A `database.collection` key split into its two parts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    /// Split at the first separator. The remainder is the collection verbatim,
    /// so `db.a.b` yields collection `a.b` and `onlydb` yields an empty one.
    pub fn split(namespace: &str) -> Self {
        let (database, collection) = namespace
            .split_once(NAMESPACE_SEPARATOR)
            .unwrap_or((namespace, ""));

        Self {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.collection.is_empty() {
            return f.write_str(&self.database);
        }
        write!(f, "{}{}{}", self.database, NAMESPACE_SEPARATOR, self.collection)
    }
}

/// Namespace to collection statistics mapping taken at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    collections: HashMap<String, CollectionStats>,
}

impl StatsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, namespace: impl Into<String>, stats: CollectionStats) {
        self.collections.insert(namespace.into(), stats);
    }

    pub fn get(&self, namespace: &str) -> Option<&CollectionStats> {
        self.collections.get(namespace)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, CollectionStats> {
        self.collections.iter()
    }

    /// Decode the JSON form of a `top` command reply.
    ///
    /// Entries are read from the `totals` document when present, otherwise
    /// from the root. Non-document entries (the `note` string, `ok`) and reply
    /// metadata whose key starts with `$` (`$clusterTime`) are skipped.
    pub fn from_top_response(json: &str) -> Result<Self> {
        let response: serde_json::Value =
            serde_json::from_str(json).context("Failed to parse top response as JSON")?;

        let totals = match response.get("totals") {
            Some(totals) => totals,
            None => &response,
        };

        let Some(entries) = totals.as_object() else {
            bail!("top response totals must be a JSON object");
        };

        let mut snapshot = Self::new();
        for (namespace, entry) in entries {
            if !entry.is_object() || namespace.starts_with(REPLY_METADATA_PREFIX) {
                continue;
            }

            let stats = CollectionStats::deserialize(entry)
                .with_context(|| format!("Invalid top statistics for namespace: {}", namespace))?;
            snapshot.insert(namespace.clone(), stats);
        }

        Ok(snapshot)
    }
}
