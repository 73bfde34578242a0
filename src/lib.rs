//! predup - near-duplicate detection for extracted predictions
//!
//! Several extraction passes over the same posts (different models, prompt
//! versions, or plain re-runs) re-derive the same claim with slightly
//! different span boundaries. Downstream scoring must count it once.
//!
//! # Architecture
//!
//! The engine is a pure, synchronous pairwise comparator:
//! - Spans are normalised per source: sorted, with overlapping, touching and
//!   one-character-apart spans merged
//! - Each field scores as intersection-over-union of covered positions,
//!   namespaced by source
//! - Two predictions are duplicates when target and timeframe both reach 0.96
//!
//! # Modules
//!
//! - `domain`: Data structures (SourceRef, Span, Field, Prediction) and validation
//! - `dedup`: Normalisation, comparison, batch clustering
//! - `store`: Append-only relation log
//! - `config`: Configuration resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Compare two predictions
//! predup compare a.json b.json
//!
//! # Cluster a batch and append relations to the log
//! predup cluster predictions.jsonl
//!
//! # Check spans against posts
//! predup validate predictions.jsonl --posts posts.jsonl
//! ```

pub mod cli;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use dedup::{
    compare_fields, compare_predictions, compare_predictions_with, normalize, ComparisonResult,
    DuplicateRelation, Thresholds, DUPLICATE_THRESHOLD,
};
pub use domain::{Field, FieldKind, Prediction, SourcePost, SourceRef, Span, SpanViolation};
pub use store::{RelationLog, RelationRecord};
