//! Domain types for prediction deduplication.
//!
//! This module contains the value types the engine reads:
//! - SourceRef / SourcePost: source documents
//! - Span: a character range within one source
//! - Field / Prediction: extracted claims grounded in spans
//! - Validation: construction-time contract checks

pub mod prediction;
pub mod source;
pub mod span;
pub mod validation;

// Re-export commonly used types
pub use prediction::{Field, FieldKind, Prediction};
pub use source::{SourcePost, SourceRef};
pub use span::Span;
pub use validation::{
    index_posts, quote_field, validate_field, validate_prediction, FieldViolation, PostIndex, SpanViolation,
    DEFAULT_MIN_SPAN_LEN,
};
