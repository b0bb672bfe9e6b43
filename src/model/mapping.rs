//! Alignment rows produced by [`crate::merge::align`].

use serde::Serialize;

use super::Cell;

/// One row of a three-way alignment.
///
/// Ties together the cell from each side that the aligner believes is the
/// same logical cell. Any side may be empty, but never all three: every cell
/// of every input appears in exactly one mapping.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellMapping {
    /// Index of the cell in the base notebook.
    pub base_index: Option<usize>,
    /// Index of the cell in the current notebook.
    pub current_index: Option<usize>,
    /// Index of the cell in the incoming notebook.
    pub incoming_index: Option<usize>,

    /// Snapshot of the base cell.
    pub base_cell: Option<Cell>,
    /// Snapshot of the current cell.
    pub current_cell: Option<Cell>,
    /// Snapshot of the incoming cell.
    pub incoming_cell: Option<Cell>,

    /// Alignment certainty in `[0, 1]`; `1.0` for an exact content match.
    pub match_confidence: f64,
}

impl CellMapping {
    /// Number of sides this row populates (1..=3).
    #[must_use]
    pub fn side_count(&self) -> usize {
        usize::from(self.base_index.is_some())
            + usize::from(self.current_index.is_some())
            + usize::from(self.incoming_index.is_some())
    }
}
