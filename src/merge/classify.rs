//! CLASSIFY step: turn an alignment into typed semantic conflicts.
//!
//! One rule per mapping shape, evaluated in this order:
//!
//! | Shape (base, current, incoming) | Result |
//! |---------------------------------|--------|
//! | any reordering (global) | one `cell-reordered`, prepended |
//! | `-, C, -` | `cell-added` (current) |
//! | `-, -, I` | `cell-added` (incoming) |
//! | `-, C, I` | sources differ: `cell-added` with both; sources equal: metadata / execution count / outputs drift |
//! | `B, -, I` | `cell-deleted` (deleted in current) |
//! | `B, C, -` | `cell-deleted` (deleted in incoming) |
//! | `B, -, -` | nothing: deleted on both sides |
//! | `B, C, I` | `cell-modified` when both diverge differently; metadata / execution count / outputs drift checked independently |
//!
//! Equality of metadata and outputs is decided on canonical forms, so key
//! order never produces a conflict.

use crate::model::{Cell, CellMapping, ConflictType, SemanticConflict};

use super::canonical;
use super::reorder::has_reordering;

/// Classify every mapping into zero or more conflicts.
///
/// Pure and deterministic: the same mappings always yield the same list.
#[must_use]
pub fn classify(mappings: &[CellMapping]) -> Vec<SemanticConflict> {
    let mut conflicts = Vec::new();

    if has_reordering(mappings) {
        conflicts.push(SemanticConflict::global(
            ConflictType::CellReordered,
            "Cells have been reordered",
        ));
    }

    for mapping in mappings {
        classify_mapping(mapping, &mut conflicts);
    }

    tracing::debug!(
        mappings = mappings.len(),
        conflicts = conflicts.len(),
        "classified alignment"
    );
    conflicts
}

fn classify_mapping(mapping: &CellMapping, out: &mut Vec<SemanticConflict>) {
    let base = mapping.base_cell.as_ref();
    let current = mapping.current_cell.as_ref();
    let incoming = mapping.incoming_cell.as_ref();

    match (base, current, incoming) {
        (None, Some(_), None) => out.push(SemanticConflict::from_mapping(
            ConflictType::CellAdded,
            mapping,
            "Cell added in current",
        )),
        (None, None, Some(_)) => out.push(SemanticConflict::from_mapping(
            ConflictType::CellAdded,
            mapping,
            "Cell added in incoming",
        )),
        (None, Some(cur), Some(inc)) => {
            if cur.source_str() != inc.source_str() {
                out.push(SemanticConflict::from_mapping(
                    ConflictType::CellAdded,
                    mapping,
                    "Cell added in both current and incoming with different content",
                ));
                return;
            }
            // Identical additions only conflict through their side effects.
            drift_conflicts(mapping, None, cur, inc, out);
        }
        (Some(_), None, Some(_)) => out.push(SemanticConflict::from_mapping(
            ConflictType::CellDeleted,
            mapping,
            "Cell deleted in current but kept in incoming",
        )),
        (Some(_), Some(_), None) => out.push(SemanticConflict::from_mapping(
            ConflictType::CellDeleted,
            mapping,
            "Cell deleted in incoming but kept in current",
        )),
        (Some(b), Some(cur), Some(inc)) => {
            let (bs, cs, is) = (b.source_str(), cur.source_str(), inc.source_str());
            if cs != bs && is != bs && cs != is {
                out.push(SemanticConflict::from_mapping(
                    ConflictType::CellModified,
                    mapping,
                    "Cell modified differently in current and incoming",
                ));
            }
            drift_conflicts(mapping, Some(b), cur, inc, out);
        }
        // Deleted on both sides, or an (impossible) empty row.
        (Some(_) | None, None, None) => {
            debug_assert!(mapping.side_count() > 0, "empty cell mapping");
        }
    }
}

/// Metadata, execution-count and output drift between current and incoming.
///
/// A field conflicts when current and incoming disagree and at least one of
/// them differs from base (an absent base counts as differing).
fn drift_conflicts(
    mapping: &CellMapping,
    base: Option<&Cell>,
    current: &Cell,
    incoming: &Cell,
    out: &mut Vec<SemanticConflict>,
) {
    let diverges = |field: fn(&Cell) -> String| {
        let (c, i) = (field(current), field(incoming));
        c != i && base.is_none_or(|b| {
            let bf = field(b);
            c != bf || i != bf
        })
    };

    if diverges(canonical::cell_metadata) {
        out.push(SemanticConflict::from_mapping(
            ConflictType::MetadataChanged,
            mapping,
            "Cell metadata differs between current and incoming",
        ));
    }

    let both_code = current.is_code() && incoming.is_code();
    if both_code && diverges(execution_count_key) {
        out.push(SemanticConflict::from_mapping(
            ConflictType::ExecutionCountChanged,
            mapping,
            format!(
                "Execution count differs: current {}, incoming {}",
                fmt_count(current.execution_count),
                fmt_count(incoming.execution_count)
            ),
        ));
    }
    if both_code && diverges(canonical::cell_outputs) {
        out.push(SemanticConflict::from_mapping(
            ConflictType::OutputsChanged,
            mapping,
            "Cell outputs differ between current and incoming",
        ));
    }
}

fn execution_count_key(cell: &Cell) -> String {
    fmt_count(cell.execution_count)
}

fn fmt_count(count: Option<i64>) -> String {
    count.map_or_else(|| "none".to_owned(), |n| n.to_string())
}
