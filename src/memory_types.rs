//! Memory record data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Optional key-value annotations stored alongside a memory.
pub type Metadata = BTreeMap<String, String>;

/// Opaque identifier of a saved memory.
///
/// Always freshly generated; never derived from content, so saving the same text
/// twice yields two distinct records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(Uuid);

impl MemoryId {
    /// Generate a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for MemoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The persisted unit: identifier, embedding, original text and optional metadata.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: MemoryId,
    pub embedding: Vec<f32>,
    pub text: String,
    pub metadata: Option<Metadata>,
}

/// A stored memory returned by a nearest-neighbor query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    pub id: MemoryId,
    pub content: String,
    /// Cosine similarity to the query (-1.0 to 1.0, higher = closer).
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}
