//! Top Statistics Module
//!
//! Data model for the per-collection operation statistics reported by the
//! database `top` command.

pub mod category;
pub mod types;

pub use category::OperationCategory;
pub use types::{CollectionStats, Namespace, OperationCounter, StatsSnapshot};
