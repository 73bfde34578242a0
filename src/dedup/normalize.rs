//! Span normalisation: canonical per-source interval sets.
//!
//! Extraction passes disagree on span boundaries far more often than on
//! content. One pass emits `"BTC will"` + `" hit $100k"`, another emits
//! `"BTC will hit $100k"`. Normalising both fields to sorted, merged
//! intervals per source makes those two cover exactly the same positions.
//!
//! Spans in the same source merge when they overlap, touch, or are
//! separated by at most [`MERGE_GAP_TOLERANCE`] characters. The bridged
//! character becomes part of the merged interval.

use std::collections::HashMap;

use crate::domain::{Field, SourceRef};

/// Largest gap (in characters) between two spans that still merges them
pub const MERGE_GAP_TOLERANCE: usize = 1;

/// A half-open `[start, end)` character range with no source attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of positions shared with `other`
    pub fn overlap(&self, other: &Interval) -> usize {
        self.end
            .min(other.end)
            .saturating_sub(self.start.max(other.start))
    }
}

/// A field's coverage, per source: sorted, disjoint intervals separated by
/// gaps strictly larger than [`MERGE_GAP_TOLERANCE`].
///
/// Built fresh for each comparison and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSpanSet {
    by_source: HashMap<SourceRef, Vec<Interval>>,
}

impl NormalizedSpanSet {
    /// Intervals covered in `source`, if any
    pub fn get(&self, source: &SourceRef) -> Option<&[Interval]> {
        self.by_source.get(source).map(Vec::as_slice)
    }

    pub fn contains_source(&self, source: &SourceRef) -> bool {
        self.by_source.contains_key(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceRef> {
        self.by_source.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceRef, &[Interval])> {
        self.by_source
            .iter()
            .map(|(source, intervals)| (source, intervals.as_slice()))
    }

    /// Number of sources with coverage
    pub fn source_count(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Total characters covered across all sources
    pub fn covered_len(&self) -> usize {
        self.by_source.values().map(|list| total_len(list)).sum()
    }

    /// True if both sets cover at least one common source
    pub fn shares_source_with(&self, other: &NormalizedSpanSet) -> bool {
        self.sources().any(|source| other.contains_source(source))
    }
}

/// Sum of interval lengths
pub fn total_len(intervals: &[Interval]) -> usize {
    intervals.iter().map(Interval::len).sum()
}

/// Normalise a field into per-source merged intervals.
///
/// The caller's field is only read. An empty field yields an empty set.
pub fn normalize(field: &Field) -> NormalizedSpanSet {
    let mut grouped: HashMap<SourceRef, Vec<Interval>> = HashMap::new();
    for span in field {
        grouped
            .entry(span.source.clone())
            .or_default()
            .push(Interval::new(span.start, span.end));
    }

    let by_source = grouped
        .into_iter()
        .map(|(source, intervals)| (source, merge_intervals(intervals)))
        .collect();

    NormalizedSpanSet { by_source }
}

/// Sort intervals by start (then end) and merge those within the gap tolerance.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_unstable();

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    let mut iter = intervals.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        // saturating_sub: overlapping spans have start < current.end
        if next.start.saturating_sub(current.end) <= MERGE_GAP_TOLERANCE {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);

    merged
}
