//! Extracted predictions and their span-grounded fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::span::Span;

/// One semantic attribute of a prediction, as the raw list of spans an
/// extraction pass produced.
///
/// Spans may be out of order, overlap, touch, or come from different
/// sources. Canonicalisation happens inside the comparator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field(Vec<Span>);

impl Field {
    pub fn new(spans: Vec<Span>) -> Self {
        Self(spans)
    }

    pub fn spans(&self) -> &[Span] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.0.iter()
    }
}

impl From<Vec<Span>> for Field {
    fn from(spans: Vec<Span>) -> Self {
        Self(spans)
    }
}

impl FromIterator<Span> for Field {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Field {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Which of a prediction's two fields a value refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// What is being predicted
    Target,
    /// When the prediction resolves
    Timeframe,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Target => write!(f, "target"),
            FieldKind::Timeframe => write!(f, "timeframe"),
        }
    }
}

/// A prediction produced by an extraction pass.
///
/// Only `target` and `timeframe` take part in duplicate detection. The
/// conversation id is used for batch partitioning; everything else the
/// extraction pipeline attaches is carried through untouched in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Unique identifier of this extraction
    pub id: String,

    /// Thread the source posts belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    pub target: Field,

    pub timeframe: Field,

    /// Caller-defined fields, opaque to deduplication
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Prediction {
    pub fn new(id: impl Into<String>, target: impl Into<Field>, timeframe: impl Into<Field>) -> Self {
        Self {
            id: id.into(),
            conversation_id: None,
            target: target.into(),
            timeframe: timeframe.into(),
            metadata: Map::new(),
        }
    }

    /// Set the conversation (thread) id.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Get one of the two compared fields
    pub fn field(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Target => &self.target,
            FieldKind::Timeframe => &self.timeframe,
        }
    }
}
