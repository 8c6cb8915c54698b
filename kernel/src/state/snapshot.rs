// Structural Snapshot
//
// Columns and indexes of a table captured when a version is
// created. The document is opaque apart from its two members.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Columns and indexes at version-creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralSnapshot {
    #[serde(rename = "COLUMNS", default)]
    pub columns: Vec<Value>,

    #[serde(rename = "INDEXES", default)]
    pub indexes: Vec<Value>,
}

#[derive(Debug, thiserror::Error)]
#[error("snapshot decode failed: {0}")]
pub struct SnapshotError(#[from] serde_json::Error);

impl StructuralSnapshot {
    pub fn new(columns: Vec<Value>, indexes: Vec<Value>) -> Self {
        Self { columns, indexes }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.indexes.is_empty()
    }

    pub fn encode(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn try_decode(blob: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(blob)?)
    }

    /// Decode a stored blob, falling back to an empty snapshot.
    pub fn decode(blob: &str) -> Self {
        match Self::try_decode(blob) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "using empty structural snapshot");
                Self::default()
            }
        }
    }
}
