//! Construction-time span validation.
//!
//! The comparator assumes well-formed spans and never re-checks them. Callers
//! run these checks once, when a prediction enters the system, against the
//! posts the spans claim to point into.
//!
//! Checks run in a fixed order and the first failure wins:
//! empty field, missing source, invalid range, too short, out of bounds.

use std::collections::HashMap;

use thiserror::Error;

use super::prediction::{Field, FieldKind, Prediction};
use super::source::{SourcePost, SourceRef};

/// Minimum span length accepted by default, in characters
pub const DEFAULT_MIN_SPAN_LEN: usize = 2;

/// A span that breaks the caller contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanViolation {
    #[error("spans are empty")]
    EmptyField,

    #[error("span references missing source {source_ref}")]
    MissingSource { source_ref: SourceRef },

    #[error("span has invalid range (start: {start}, end: {end})")]
    InvalidRange { start: usize, end: usize },

    #[error("span too short ({len} characters, minimum {min})")]
    TooShort { len: usize, min: usize },

    #[error("span end index {end} exceeds source {source_ref} length {len}")]
    OutOfBounds {
        source_ref: SourceRef,
        end: usize,
        len: usize,
    },

    #[error("substring {needle:?} not found in source {source_ref}")]
    SubstringNotFound { source_ref: SourceRef, needle: String },
}

impl SpanViolation {
    /// Stable machine-readable cause code
    pub fn code(&self) -> &'static str {
        match self {
            SpanViolation::EmptyField => "empty_slices",
            SpanViolation::MissingSource { .. } => "missing_source",
            SpanViolation::InvalidRange { .. } => "invalid_range",
            SpanViolation::TooShort { .. } => "slice_too_short",
            SpanViolation::OutOfBounds { .. } => "out_of_bounds",
            SpanViolation::SubstringNotFound { .. } => "substring_not_found",
        }
    }
}

/// A violation attributed to one field of a prediction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {violation}")]
pub struct FieldViolation {
    pub field: FieldKind,
    #[source]
    pub violation: SpanViolation,
}

/// Posts indexed by id, as needed for validation
pub type PostIndex = HashMap<SourceRef, SourcePost>;

/// Build a [`PostIndex`] from a list of posts. Later duplicates win.
pub fn index_posts(posts: impl IntoIterator<Item = SourcePost>) -> PostIndex {
    posts.into_iter().map(|post| (post.id.clone(), post)).collect()
}

/// Validate every span of one field against the posts it references.
pub fn validate_field(
    field: &Field,
    kind: FieldKind,
    posts: &PostIndex,
    min_span_len: usize,
) -> Result<(), FieldViolation> {
    let fail = |violation| Err(FieldViolation { field: kind, violation });

    if field.is_empty() {
        return fail(SpanViolation::EmptyField);
    }

    for span in field {
        let Some(post) = posts.get(&span.source) else {
            return fail(SpanViolation::MissingSource {
                source_ref: span.source.clone(),
            });
        };

        if span.start >= span.end {
            return fail(SpanViolation::InvalidRange {
                start: span.start,
                end: span.end,
            });
        }

        if span.len() < min_span_len {
            return fail(SpanViolation::TooShort {
                len: span.len(),
                min: min_span_len,
            });
        }

        let len = post.char_len();
        if span.end > len {
            return fail(SpanViolation::OutOfBounds {
                source_ref: span.source.clone(),
                end: span.end,
                len,
            });
        }
    }

    Ok(())
}

/// Quoted text of every span in `field`, joined with ` | `.
///
/// Returns `None` when a span points at a post missing from `posts`.
pub fn quote_field(field: &Field, posts: &PostIndex) -> Option<String> {
    let quotes = field
        .iter()
        .map(|span| posts.get(&span.source).map(|post| post.slice(span.start, span.end)))
        .collect::<Option<Vec<_>>>()?;
    Some(quotes.join(" | "))
}

/// Validate target, then timeframe.
pub fn validate_prediction(
    prediction: &Prediction,
    posts: &PostIndex,
    min_span_len: usize,
) -> Result<(), FieldViolation> {
    validate_field(&prediction.target, FieldKind::Target, posts, min_span_len)?;
    validate_field(&prediction.timeframe, FieldKind::Timeframe, posts, min_span_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Span;

    fn posts() -> PostIndex {
        index_posts([
            SourcePost::new("t1", "BTC will hit $100k by end of 2025"),
            SourcePost::new("t2", "I mean it will hit $100k"),
        ])
    }

    fn raw(source: &str, start: usize, end: usize) -> Span {
        // Bypass the constructor to model malformed upstream data
        Span {
            source: SourceRef::new(source),
            start,
            end,
        }
    }

    #[test]
    fn test_valid_field() {
        let field = Field::new(vec![raw("t1", 0, 18), raw("t2", 7, 24)]);
        assert!(validate_field(&field, FieldKind::Target, &posts(), 2).is_ok());
    }

    #[test]
    fn test_empty_field() {
        let err = validate_field(&Field::default(), FieldKind::Timeframe, &posts(), 2).unwrap_err();
        assert_eq!(err.field, FieldKind::Timeframe);
        assert_eq!(err.violation, SpanViolation::EmptyField);
        assert_eq!(err.to_string(), "timeframe spans are empty");
    }

    #[test]
    fn test_missing_source() {
        let field = Field::new(vec![raw("t9", 0, 4)]);
        let err = validate_field(&field, FieldKind::Target, &posts(), 2).unwrap_err();
        assert_eq!(err.violation.code(), "missing_source");
    }

    #[test]
    fn test_invalid_range() {
        let field = Field::new(vec![raw("t1", 8, 8)]);
        let err = validate_field(&field, FieldKind::Target, &posts(), 2).unwrap_err();
        assert_eq!(err.violation, SpanViolation::InvalidRange { start: 8, end: 8 });
    }

    #[test]
    fn test_too_short() {
        let field = Field::new(vec![raw("t1", 0, 1)]);
        let err = validate_field(&field, FieldKind::Target, &posts(), 2).unwrap_err();
        assert_eq!(err.violation, SpanViolation::TooShort { len: 1, min: 2 });

        // A lower minimum accepts it
        assert!(validate_field(&field, FieldKind::Target, &posts(), 1).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let field = Field::new(vec![raw("t2", 10, 30)]);
        let err = validate_field(&field, FieldKind::Target, &posts(), 2).unwrap_err();
        assert!(matches!(
            err.violation,
            SpanViolation::OutOfBounds { end: 30, len: 24, .. }
        ));
    }

    #[test]
    fn test_first_failure_wins() {
        // Too short and out of bounds: too short is checked first
        let field = Field::new(vec![raw("t2", 40, 41)]);
        let err = validate_field(&field, FieldKind::Target, &posts(), 2).unwrap_err();
        assert_eq!(err.violation.code(), "slice_too_short");
    }

    #[test]
    fn test_quote_field() {
        let field = Field::new(vec![raw("t1", 0, 3), raw("t2", 19, 24)]);
        assert_eq!(quote_field(&field, &posts()).as_deref(), Some("BTC | $100k"));

        let missing = Field::new(vec![raw("t9", 0, 3)]);
        assert_eq!(quote_field(&missing, &posts()), None);
    }

    #[test]
    fn test_prediction_checks_target_first() {
        let prediction = Prediction::new("p", Field::default(), Field::default());
        let err = validate_prediction(&prediction, &posts(), 2).unwrap_err();
        assert_eq!(err.field, FieldKind::Target);
    }
}
