//! Semantic conflict model: the typed divergences the classifier emits.
//!
//! # Conflict types
//!
//! | Type | Raised when |
//! |------|-------------|
//! | [`ConflictType::CellAdded`] | A cell exists on one side only, or both sides added different cells at one position |
//! | [`ConflictType::CellDeleted`] | One side deleted a base cell the other side kept |
//! | [`ConflictType::CellModified`] | Both sides edited a cell's source, differently |
//! | [`ConflictType::MetadataChanged`] | Cell metadata diverges between current and incoming |
//! | [`ConflictType::ExecutionCountChanged`] | Execution counts diverge (code cells) |
//! | [`ConflictType::OutputsChanged`] | Outputs diverge (code cells) |
//! | [`ConflictType::CellReordered`] | Matched cells appear in inconsistent relative order |
//!
//! # Serialization
//!
//! Conflict types serialize in kebab-case:
//!
//! ```json
//! {
//!   "type": "cell-modified",
//!   "base_index": 2, "current_index": 2, "incoming_index": 3,
//!   "base_content": { ... }, "current_content": { ... }, "incoming_content": { ... },
//!   "description": "Cell modified differently in current and incoming"
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Cell, CellMapping};

// ---------------------------------------------------------------------------
// ConflictType
// ---------------------------------------------------------------------------

/// The kind of a [`SemanticConflict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// A cell was added on one side, or on both sides with different content.
    CellAdded,
    /// A cell was deleted on one side and kept on the other.
    CellDeleted,
    /// A cell's source was changed on both sides in different ways.
    CellModified,
    /// Cell metadata diverges.
    MetadataChanged,
    /// Execution counts diverge.
    ExecutionCountChanged,
    /// Outputs diverge.
    OutputsChanged,
    /// Cells were reordered relative to each other.
    CellReordered,
}

impl ConflictType {
    /// The kebab-case name used in JSON output and audit messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CellAdded => "cell-added",
            Self::CellDeleted => "cell-deleted",
            Self::CellModified => "cell-modified",
            Self::MetadataChanged => "metadata-changed",
            Self::ExecutionCountChanged => "execution-count-changed",
            Self::OutputsChanged => "outputs-changed",
            Self::CellReordered => "cell-reordered",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SemanticConflict
// ---------------------------------------------------------------------------

/// A typed divergence between the three versions of a notebook.
///
/// Carries the indices and cell snapshots relevant to the divergence. Sides
/// that play no part in the conflict are `None` (a `cell-added` on the
/// incoming side only carries incoming data, a `cell-reordered` carries
/// nothing but its description).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SemanticConflict {
    /// What kind of divergence this is.
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,

    /// Index in the base notebook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_index: Option<usize>,
    /// Index in the current notebook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_index: Option<usize>,
    /// Index in the incoming notebook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_index: Option<usize>,

    /// Base cell snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_content: Option<Cell>,
    /// Current cell snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_content: Option<Cell>,
    /// Incoming cell snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming_content: Option<Cell>,

    /// Human-readable description.
    pub description: String,
}

impl SemanticConflict {
    /// A conflict that carries no cell data (used for `cell-reordered`).
    #[must_use]
    pub fn global(conflict_type: ConflictType, description: impl Into<String>) -> Self {
        Self {
            conflict_type,
            base_index: None,
            current_index: None,
            incoming_index: None,
            base_content: None,
            current_content: None,
            incoming_content: None,
            description: description.into(),
        }
    }

    /// A conflict carrying every populated side of `mapping`.
    #[must_use]
    pub fn from_mapping(
        conflict_type: ConflictType,
        mapping: &CellMapping,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            base_index: mapping.base_index,
            current_index: mapping.current_index,
            incoming_index: mapping.incoming_index,
            base_content: mapping.base_cell.clone(),
            current_content: mapping.current_cell.clone(),
            incoming_content: mapping.incoming_cell.clone(),
            description: description.into(),
        }
    }

    /// One-line summary: type, the indices involved, and the description.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut sides = Vec::new();
        if let Some(i) = self.base_index {
            sides.push(format!("base #{i}"));
        }
        if let Some(i) = self.current_index {
            sides.push(format!("current #{i}"));
        }
        if let Some(i) = self.incoming_index {
            sides.push(format!("incoming #{i}"));
        }
        if sides.is_empty() {
            format!("{}: {}", self.conflict_type, self.description)
        } else {
            format!(
                "{} [{}]: {}",
                self.conflict_type,
                sides.join(", "),
                self.description
            )
        }
    }
}

impl fmt::Display for SemanticConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
