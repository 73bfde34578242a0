//! Spans: half-open character ranges within one source document.

use serde::{Deserialize, Serialize};

use super::source::{SourcePost, SourceRef};
use super::validation::SpanViolation;

/// A half-open range `[start, end)` over the characters of one source.
///
/// Spans are plain values: a copied pair of offsets plus the source key,
/// never a reference into a live text buffer. Deserializing goes through
/// [`Span::new`], so inverted ranges are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSpan")]
pub struct Span {
    /// Document this span points into
    pub source: SourceRef,
    /// First character covered
    pub start: usize,
    /// One past the last character covered
    pub end: usize,
}

/// Wire shape of a [`Span`] before the range check
#[derive(Deserialize)]
struct RawSpan {
    source: SourceRef,
    start: usize,
    end: usize,
}

impl TryFrom<RawSpan> for Span {
    type Error = SpanViolation;

    fn try_from(raw: RawSpan) -> Result<Self, Self::Error> {
        Span::new(raw.source, raw.start, raw.end)
    }
}

impl Span {
    /// Create a span, rejecting empty or inverted ranges.
    pub fn new(source: impl Into<SourceRef>, start: usize, end: usize) -> Result<Self, SpanViolation> {
        if start >= end {
            return Err(SpanViolation::InvalidRange { start, end });
        }
        Ok(Self {
            source: source.into(),
            start,
            end,
        })
    }

    /// Create a span into `post`, also rejecting offsets past the end of its text.
    pub fn within(post: &SourcePost, start: usize, end: usize) -> Result<Self, SpanViolation> {
        let span = Self::new(post.id.clone(), start, end)?;
        let len = post.char_len();
        if end > len {
            return Err(SpanViolation::OutOfBounds {
                source_ref: post.id.clone(),
                end,
                len,
            });
        }
        Ok(span)
    }

    /// Span covering the first occurrence of `needle` in `post`.
    pub fn of(post: &SourcePost, needle: &str) -> Result<Self, SpanViolation> {
        let byte_idx = post
            .text
            .find(needle)
            .filter(|_| !needle.is_empty())
            .ok_or_else(|| SpanViolation::SubstringNotFound {
                source_ref: post.id.clone(),
                needle: needle.to_string(),
            })?;

        let start = post.text[..byte_idx].chars().count();
        let end = start + needle.chars().count();
        Self::within(post, start, end)
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> SourcePost {
        SourcePost::new("tweet_btc_100k", "BTC will hit $100k by end of 2025")
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        assert_eq!(
            Span::new("t", 5, 5),
            Err(SpanViolation::InvalidRange { start: 5, end: 5 })
        );
        assert!(Span::new("t", 6, 2).is_err());
        assert_eq!(Span::new("t", 2, 6).unwrap().len(), 4);
    }

    #[test]
    fn test_deserialize_rejects_inverted_range() {
        let result = serde_json::from_str::<Span>(r#"{"source":"t","start":9,"end":2}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid range"));

        assert!(serde_json::from_str::<Span>(r#"{"source":"t","start":4,"end":4}"#).is_err());

        let span: Span = serde_json::from_str(r#"{"source":"t","start":0,"end":10}"#).unwrap();
        assert_eq!(span, Span::new("t", 0, 10).unwrap());
    }

    #[test]
    fn test_within_rejects_out_of_bounds() {
        let post = post();
        assert!(Span::within(&post, 0, 33).is_ok());
        let result = Span::within(&post, 30, 34);
        assert!(matches!(
            result,
            Err(SpanViolation::OutOfBounds { end: 34, len: 33, .. })
        ));
    }

    #[test]
    fn test_of_locates_substring() {
        let post = post();
        let span = Span::of(&post, "BTC will hit $100k").unwrap();
        assert_eq!((span.start, span.end), (0, 18));

        let span = Span::of(&post, "by end of 2025").unwrap();
        assert_eq!((span.start, span.end), (19, 33));
        assert_eq!(span.source.as_str(), "tweet_btc_100k");
    }

    #[test]
    fn test_of_counts_chars_not_bytes() {
        let post = SourcePost::new("p", "€€ moon by 2026");
        let span = Span::of(&post, "2026").unwrap();
        assert_eq!((span.start, span.end), (11, 15));
    }

    #[test]
    fn test_of_missing_substring() {
        let post = post();
        assert!(matches!(
            Span::of(&post, "ETH"),
            Err(SpanViolation::SubstringNotFound { .. })
        ));
        assert!(Span::of(&post, "").is_err());
    }
}
