//! Persistence for deduplication output.

pub mod relation_log;

pub use relation_log::{RelationLog, RelationRecord};
