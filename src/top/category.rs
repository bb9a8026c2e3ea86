//! Operation Categories
//!
//! The closed set of operation buckets every `CollectionStats` record carries.
//! `OperationCategory::ALL` fixes the order in which they are exported.

use super::{CollectionStats, OperationCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationCategory {
    Total,
    ReadLock,
    WriteLock,
    Queries,
    GetMore,
    Insert,
    Update,
    Remove,
    Commands,
}

impl OperationCategory {
    pub const ALL: [OperationCategory; 9] = [
        OperationCategory::Total,
        OperationCategory::ReadLock,
        OperationCategory::WriteLock,
        OperationCategory::Queries,
        OperationCategory::GetMore,
        OperationCategory::Insert,
        OperationCategory::Update,
        OperationCategory::Remove,
        OperationCategory::Commands,
    ];

    /// Value of the `type` label
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationCategory::Total => "Total",
            OperationCategory::ReadLock => "ReadLock",
            OperationCategory::WriteLock => "WriteLock",
            OperationCategory::Queries => "Queries",
            OperationCategory::GetMore => "GetMore",
            OperationCategory::Insert => "Insert",
            OperationCategory::Update => "Update",
            OperationCategory::Remove => "Remove",
            OperationCategory::Commands => "Commands",
        }
    }

    pub fn counter<'a>(&self, stats: &'a CollectionStats) -> &'a OperationCounter {
        match self {
            OperationCategory::Total => &stats.total,
            OperationCategory::ReadLock => &stats.read_lock,
            OperationCategory::WriteLock => &stats.write_lock,
            OperationCategory::Queries => &stats.queries,
            OperationCategory::GetMore => &stats.get_more,
            OperationCategory::Insert => &stats.insert,
            OperationCategory::Update => &stats.update,
            OperationCategory::Remove => &stats.remove,
            OperationCategory::Commands => &stats.commands,
        }
    }
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
