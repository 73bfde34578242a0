//! Source documents that predictions are grounded in.

use serde::{Deserialize, Serialize};

/// Opaque identifier of one source document (e.g. one post in a thread).
///
/// Spans carrying different `SourceRef`s never intersect, whatever their
/// numeric offsets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SourceRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A retrieved post: the text that span offsets point into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePost {
    /// Post identifier, used as the `SourceRef` of spans into this post
    pub id: SourceRef,

    /// Full post text
    pub text: String,

    /// Author handle, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl SourcePost {
    pub fn new(id: impl Into<SourceRef>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author: None,
        }
    }

    /// Length of the post in characters (span offsets count chars, not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Text covered by the half-open character range `[start, end)`.
    ///
    /// Out-of-range offsets are clamped to the end of the post.
    pub fn slice(&self, start: usize, end: usize) -> String {
        self.text
            .chars()
            .skip(start)
            .take(end.saturating_sub(start))
            .collect()
    }
}
