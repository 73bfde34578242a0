//! Grouping pairwise duplicate verdicts into clusters.
//!
//! The comparator only answers "are these two the same claim". This module
//! is the batch caller: it compares every pair in a window of predictions,
//! unions duplicates in a disjoint set, and reports each non-canonical
//! prediction against its cluster root. The root is always the
//! lexicographically smallest id, so results do not depend on input order.
//!
//! Because duplicate verdicts are not transitive, a prediction can land in a
//! cluster whose root it does not itself match. Its reported similarity is
//! then below the threshold; that is expected.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::compare::{compare_normalized, NormalizedPrediction, Thresholds};
use crate::domain::Prediction;

/// A prediction recorded as a duplicate of a canonical one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRelation {
    pub prediction_id: String,
    pub canonical_id: String,
    /// Mean of target and timeframe scores against the canonical prediction
    pub similarity_score: f64,
}

impl DuplicateRelation {
    /// Deterministic 16-hex-char id: sha256("{prediction_id}:{canonical_id}")[0:8]
    pub fn relation_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prediction_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.canonical_id.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

/// Canonical prediction found for one member of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMatch {
    pub canonical_id: String,
    pub similarity_score: f64,
}

/// Union-find over batch indices, rooted at the smallest id
struct DisjointSet<'a> {
    ids: Vec<&'a str>,
    parent: Vec<usize>,
}

impl<'a> DisjointSet<'a> {
    fn new(ids: Vec<&'a str>) -> Self {
        let parent = (0..ids.len()).collect();
        Self { ids, parent }
    }

    fn find(&mut self, idx: usize) -> usize {
        let mut root = idx;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression
        let mut node = idx;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        if self.ids[root_a] < self.ids[root_b] {
            self.parent[root_b] = root_a;
        } else {
            self.parent[root_a] = root_b;
        }
    }
}

/// Batch with repeated ids dropped (first occurrence kept)
fn unique_by_id(predictions: &[Prediction]) -> Vec<&Prediction> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        if seen.insert(prediction.id.as_str()) {
            unique.push(prediction);
        } else {
            warn!(id = %prediction.id, "Duplicate prediction id in batch, ignoring repeat");
        }
    }
    unique
}

/// Pairwise clustering result, kept internal so both public entry points
/// share one pass.
struct Clustering<'a> {
    batch: Vec<&'a Prediction>,
    normalized: Vec<NormalizedPrediction>,
    set: DisjointSet<'a>,
}

impl<'a> Clustering<'a> {
    fn build(predictions: &'a [Prediction], thresholds: &Thresholds) -> Self {
        let batch = unique_by_id(predictions);
        let normalized: Vec<NormalizedPrediction> =
            batch.iter().map(|&p| NormalizedPrediction::new(p)).collect();
        let mut set = DisjointSet::new(batch.iter().map(|&p| p.id.as_str()).collect());

        // Disjoint target sources always score 0, which cannot pass a
        // positive threshold
        let skip_disjoint = thresholds.target > 0.0;

        for i in 0..batch.len() {
            for j in (i + 1)..batch.len() {
                let (a, b) = (&normalized[i], &normalized[j]);
                if skip_disjoint && !a.target.shares_source_with(&b.target) {
                    continue;
                }
                if compare_normalized(a, b, thresholds).is_duplicate {
                    debug!(a = %batch[i].id, b = %batch[j].id, "Duplicate pair");
                    set.union(i, j);
                }
            }
        }

        Self {
            batch,
            normalized,
            set,
        }
    }

    /// Relation of the prediction at `idx` to its root, if it is not the root
    fn relation(&mut self, idx: usize, thresholds: &Thresholds) -> Option<DuplicateRelation> {
        let root = self.set.find(idx);
        if root == idx {
            return None;
        }

        let result = compare_normalized(&self.normalized[idx], &self.normalized[root], thresholds);
        Some(DuplicateRelation {
            prediction_id: self.batch[idx].id.clone(),
            canonical_id: self.batch[root].id.clone(),
            similarity_score: result.similarity(),
        })
    }
}

/// Cluster a batch and return one relation per non-canonical prediction,
/// in input order.
pub fn cluster(predictions: &[Prediction], thresholds: &Thresholds) -> Vec<DuplicateRelation> {
    if predictions.len() < 2 {
        return Vec::new();
    }

    let mut clustering = Clustering::build(predictions, thresholds);
    (0..clustering.batch.len())
        .filter_map(|idx| clustering.relation(idx, thresholds))
        .collect()
}

/// Canonical prediction for `prediction_id` within a batch.
///
/// Returns `None` when the prediction is its own root, is absent, or the
/// batch has fewer than two predictions.
pub fn find_canonical(
    prediction_id: &str,
    predictions: &[Prediction],
    thresholds: &Thresholds,
) -> Option<CanonicalMatch> {
    if predictions.len() < 2 {
        return None;
    }

    let mut clustering = Clustering::build(predictions, thresholds);
    let idx = clustering
        .batch
        .iter()
        .position(|p| p.id == prediction_id)?;

    clustering.relation(idx, thresholds).map(|relation| CanonicalMatch {
        canonical_id: relation.canonical_id,
        similarity_score: relation.similarity_score,
    })
}

/// Split a batch into per-conversation windows.
///
/// Predictions without a conversation id form singleton groups keyed by
/// their own id. Groups come back sorted by key.
pub fn partition_by_conversation(predictions: Vec<Prediction>) -> BTreeMap<String, Vec<Prediction>> {
    let mut groups: BTreeMap<String, Vec<Prediction>> = BTreeMap::new();
    for prediction in predictions {
        let key = prediction
            .conversation_id
            .clone()
            .unwrap_or_else(|| prediction.id.clone());
        groups.entry(key).or_default().push(prediction);
    }
    groups
}
