//! Three-way, cell-aware notebook merge engine.
//!
//! Implements the align → classify → resolve pipeline. Each step is a
//! separate module and a pure function of its inputs:
//!
//! - **canonical**: key-order independent canonical forms and cell
//!   fingerprints ([`canonical::Fingerprint`]).
//! - **align**: match cells across base, current and incoming into
//!   [`CellMapping`] rows.
//! - **reorder**: detect whether shared cells changed relative order.
//! - **classify**: turn the alignment into typed [`SemanticConflict`]s.
//! - **resolve**: apply [`Settings`] to auto-resolve trivial conflicts.
//! - **position**: the row order shared by the aligner and the classifier.
//!
//! # Determinism guarantee
//!
//! The same three notebooks and settings always produce the same mappings,
//! conflicts and resolved notebook:
//!
//! - Matching ties break on the lowest index.
//! - Rows are ordered by [`position::RowPosition`], a total order.
//! - Metadata and outputs are compared on canonical forms, never on JSON key
//!   order.

pub mod align;
pub mod canonical;
pub mod classify;
pub mod position;
pub mod reorder;
pub mod resolve;
pub mod similarity;

use serde::Serialize;

pub use align::{align, align_versions};
pub use canonical::canonicalize;
pub use classify::classify;
pub use position::sort_by_position;
pub use reorder::has_reordering;
pub use resolve::{AutoResolveResult, auto_resolve};

use crate::config::Settings;
use crate::error::MergeError;
use crate::model::{CellMapping, SemanticConflict, Versions};

/// Everything one pipeline run produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeAnalysis {
    /// The three-way alignment, in position order.
    pub mappings: Vec<CellMapping>,
    /// Every conflict the classifier found, before auto-resolution.
    pub conflicts: Vec<SemanticConflict>,
    /// The auto-resolution outcome.
    pub resolution: AutoResolveResult,
}

impl MergeAnalysis {
    /// Returns `true` if nothing is left for a human to resolve.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.resolution.is_clean()
    }
}

/// Run the whole pipeline over whichever versions are present.
///
/// # Errors
/// Returns [`MergeError::InsufficientInput`] when fewer than two of the three
/// versions are available.
pub fn analyze(versions: Versions<'_>, settings: &Settings) -> Result<MergeAnalysis, MergeError> {
    let available = versions.available();
    if available.len() < 2 {
        return Err(MergeError::InsufficientInput { available });
    }

    let mappings = align_versions(versions);
    let conflicts = classify(&mappings);
    let resolution = auto_resolve(versions, &conflicts, settings);

    tracing::info!(
        mappings = mappings.len(),
        conflicts = conflicts.len(),
        auto_resolved = resolution.auto_resolved_count,
        remaining = resolution.remaining_conflicts.len(),
        kernel_auto_resolved = resolution.kernel_auto_resolved,
        "notebook merge analyzed"
    );

    Ok(MergeAnalysis {
        mappings,
        conflicts,
        resolution,
    })
}
