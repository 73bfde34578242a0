//! Near-duplicate detection for span-grounded predictions.
//!
//! Repeated extraction passes over the same thread re-derive the same claim
//! with slightly different span boundaries. This module decides, for a pair
//! of predictions, whether they are the same claim.
//!
//! # Pipeline
//!
//! 1. [`normalize`]: group each field's spans by source, sort, and merge
//!    spans that overlap or sit at most one character apart.
//! 2. [`compare_fields`]: intersection-over-union of covered positions,
//!    namespaced by source.
//! 3. [`compare_predictions`]: both field scores must reach
//!    [`DUPLICATE_THRESHOLD`] (0.96).
//!
//! Everything here is pure and synchronous. [`cluster`] is a batch caller
//! built on top of the pairwise verdict.
//!
//! # Example
//!
//! ```
//! use predup::dedup::compare_predictions;
//! use predup::domain::{Prediction, SourcePost, Span};
//!
//! let post = SourcePost::new("t1", "BTC will hit $100k by end of 2025");
//! let whole = Prediction::new(
//!     "a",
//!     vec![Span::of(&post, "BTC will hit $100k").unwrap()],
//!     vec![Span::of(&post, "by end of 2025").unwrap()],
//! );
//! let split = Prediction::new(
//!     "b",
//!     vec![
//!         Span::of(&post, "BTC will").unwrap(),
//!         Span::of(&post, " hit $100k").unwrap(),
//!     ],
//!     vec![Span::of(&post, "by end of 2025").unwrap()],
//! );
//!
//! let result = compare_predictions(&whole, &split);
//! assert!(result.is_duplicate);
//! assert_eq!(result.target_score, 1.0);
//! ```

pub mod cluster;
pub mod compare;
pub mod normalize;

pub use cluster::{cluster, find_canonical, partition_by_conversation, CanonicalMatch, DuplicateRelation};
pub use compare::{
    compare_fields, compare_normalized, compare_predictions, compare_predictions_with,
    field_overlap, ComparisonResult, NormalizedPrediction, Overlap, Thresholds,
    DUPLICATE_THRESHOLD,
};
pub use normalize::{merge_intervals, normalize, Interval, NormalizedSpanSet, MERGE_GAP_TOLERANCE};
