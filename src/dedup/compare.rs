//! Span-set comparison: intersection-over-union of covered positions.
//!
//! Each field is scored as a Jaccard similarity over the character positions
//! it covers, with the source id as a namespace: the same words in two
//! different posts share nothing. Target and timeframe are scored
//! independently and both must clear the threshold.
//!
//! The verdict is not transitive. With nested spans of lengths 250, 240 and
//! 235, the outer pairs score 0.96 and ~0.979 while the extremes score 0.94.
//! Clustering on top of pairwise verdicts has to live with that.

use serde::{Deserialize, Serialize};

use super::normalize::{normalize, total_len, Interval, NormalizedSpanSet};
use crate::domain::{Field, Prediction};

/// Score both fields must reach for a pair to count as duplicates
pub const DUPLICATE_THRESHOLD: f64 = 0.96;

/// Per-field duplicate thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub target: f64,
    pub timeframe: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::uniform(DUPLICATE_THRESHOLD)
    }
}

impl Thresholds {
    /// Same threshold for both fields
    pub fn uniform(value: f64) -> Self {
        Self {
            target: value,
            timeframe: value,
        }
    }

    /// Both thresholds are within `[0, 1]`
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.target) && (0.0..=1.0).contains(&self.timeframe)
    }
}

/// Outcome of comparing two predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub is_duplicate: bool,
    pub target_score: f64,
    pub timeframe_score: f64,
}

impl ComparisonResult {
    /// Mean of the two field scores
    pub fn similarity(&self) -> f64 {
        (self.target_score + self.timeframe_score) / 2.0
    }
}

/// Shared and total covered characters between two fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overlap {
    pub intersection: usize,
    pub union: usize,
}

impl Overlap {
    /// `intersection / union`, or 0 when nothing is covered
    pub fn score(&self) -> f64 {
        if self.union == 0 {
            0.0
        } else {
            self.intersection as f64 / self.union as f64
        }
    }
}

/// Both fields of a prediction, normalised once so a prediction can be
/// compared against many others without re-sorting its spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedPrediction {
    pub target: NormalizedSpanSet,
    pub timeframe: NormalizedSpanSet,
}

impl NormalizedPrediction {
    pub fn new(prediction: &Prediction) -> Self {
        Self {
            target: normalize(&prediction.target),
            timeframe: normalize(&prediction.timeframe),
        }
    }
}

/// Intersection and union sizes of two normalised fields.
///
/// Sources present on one side only add their length to the union.
pub fn field_overlap(a: &NormalizedSpanSet, b: &NormalizedSpanSet) -> Overlap {
    let mut overlap = Overlap::default();

    for (source, a_list) in a.iter() {
        match b.get(source) {
            Some(b_list) => {
                overlap.intersection += intersection_len(a_list, b_list);
                overlap.union += union_len(a_list, b_list);
            }
            None => overlap.union += total_len(a_list),
        }
    }

    for (source, b_list) in b.iter() {
        if !a.contains_source(source) {
            overlap.union += total_len(b_list);
        }
    }

    overlap
}

/// Positions covered by both sorted, disjoint interval lists.
fn intersection_len(a: &[Interval], b: &[Interval]) -> usize {
    let (mut i, mut j) = (0, 0);
    let mut shared = 0;

    while i < a.len() && j < b.len() {
        shared += a[i].overlap(&b[j]);
        // Advance whichever interval finishes first
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }

    shared
}

/// Positions covered by either sorted, disjoint interval list.
fn union_len(a: &[Interval], b: &[Interval]) -> usize {
    let (mut i, mut j) = (0, 0);
    let mut covered = 0;
    let mut current: Option<Interval> = None;

    loop {
        let next = match (a.get(i), b.get(j)) {
            (Some(x), Some(y)) if x.start <= y.start => {
                i += 1;
                *x
            }
            (Some(_), Some(y)) => {
                j += 1;
                *y
            }
            (Some(x), None) => {
                i += 1;
                *x
            }
            (None, Some(y)) => {
                j += 1;
                *y
            }
            (None, None) => break,
        };

        current = match current {
            Some(mut cur) if next.start <= cur.end => {
                cur.end = cur.end.max(next.end);
                Some(cur)
            }
            Some(cur) => {
                covered += cur.len();
                Some(next)
            }
            None => Some(next),
        };
    }

    covered + current.map_or(0, |cur| cur.len())
}

/// Similarity of two fields in `[0, 1]`.
pub fn compare_fields(a: &Field, b: &Field) -> f64 {
    field_overlap(&normalize(a), &normalize(b)).score()
}

/// Compare two predictions against the fixed [`DUPLICATE_THRESHOLD`].
pub fn compare_predictions(p1: &Prediction, p2: &Prediction) -> ComparisonResult {
    compare_predictions_with(p1, p2, &Thresholds::default())
}

/// Compare two predictions against caller-chosen thresholds.
pub fn compare_predictions_with(
    p1: &Prediction,
    p2: &Prediction,
    thresholds: &Thresholds,
) -> ComparisonResult {
    compare_normalized(
        &NormalizedPrediction::new(p1),
        &NormalizedPrediction::new(p2),
        thresholds,
    )
}

/// Compare two already-normalised predictions.
pub fn compare_normalized(
    a: &NormalizedPrediction,
    b: &NormalizedPrediction,
    thresholds: &Thresholds,
) -> ComparisonResult {
    let target_score = field_overlap(&a.target, &b.target).score();
    let timeframe_score = field_overlap(&a.timeframe, &b.timeframe).score();

    ComparisonResult {
        is_duplicate: target_score >= thresholds.target
            && timeframe_score >= thresholds.timeframe,
        target_score,
        timeframe_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Span;

    fn iv(start: usize, end: usize) -> Interval {
        Interval::new(start, end)
    }

    fn field(spans: &[(&str, usize, usize)]) -> Field {
        spans
            .iter()
            .map(|&(source, start, end)| Span::new(source, start, end).unwrap())
            .collect()
    }

    #[test]
    fn test_intersection_len_multi_interval() {
        let a = [iv(0, 5), iv(10, 20), iv(30, 40)];
        let b = [iv(3, 12), iv(18, 35)];
        // 3..5 + 10..12 + 18..20 + 30..35
        assert_eq!(intersection_len(&a, &b), 2 + 2 + 2 + 5);
        assert_eq!(intersection_len(&b, &a), 11);
    }

    #[test]
    fn test_union_len_multi_interval() {
        let a = [iv(0, 5), iv(10, 20), iv(30, 40)];
        let b = [iv(3, 12), iv(18, 35)];
        // 0..40 is fully covered
        assert_eq!(union_len(&a, &b), 40);
        assert_eq!(union_len(&a, &[]), 25);
        assert_eq!(union_len(&[], &[]), 0);
    }

    #[test]
    fn test_union_len_disjoint() {
        assert_eq!(union_len(&[iv(0, 4)], &[iv(10, 12)]), 6);
    }

    #[test]
    fn test_field_overlap_one_sided_source() {
        let a = normalize(&field(&[("t1", 0, 10), ("t2", 0, 5)]));
        let b = normalize(&field(&[("t1", 0, 10)]));
        let overlap = field_overlap(&a, &b);
        assert_eq!(overlap, Overlap { intersection: 10, union: 15 });
    }

    #[test]
    fn test_empty_fields_score_zero() {
        assert_eq!(compare_fields(&Field::default(), &Field::default()), 0.0);
        assert_eq!(compare_fields(&field(&[("t", 0, 4)]), &Field::default()), 0.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let p1 = Prediction::new("a", field(&[("t", 0, 10)]), field(&[("t", 20, 24)]));
        let p2 = Prediction::new("b", field(&[("t", 0, 8)]), field(&[("t", 20, 24)]));

        let strict = compare_predictions(&p1, &p2);
        assert!(!strict.is_duplicate);
        assert_eq!(strict.target_score, 0.8);

        let lenient = compare_predictions_with(&p1, &p2, &Thresholds::uniform(0.75));
        assert!(lenient.is_duplicate);
    }

    #[test]
    fn test_similarity_is_mean() {
        let result = ComparisonResult {
            is_duplicate: false,
            target_score: 0.5,
            timeframe_score: 1.0,
        };
        assert_eq!(result.similarity(), 0.75);
    }

    #[test]
    fn test_thresholds_validity() {
        assert!(Thresholds::default().is_valid());
        assert!(!Thresholds::uniform(1.5).is_valid());
        assert!(!Thresholds { target: 0.9, timeframe: -0.1 }.is_valid());
    }
}
