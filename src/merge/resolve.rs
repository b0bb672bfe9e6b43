//! RESOLVE step: policy-driven auto-resolution of trivial conflicts.
//!
//! Takes the classified conflicts plus [`Settings`] and produces:
//!
//! - a resolved notebook: a private deep copy of current (incoming when
//!   current is absent) with trivial conflicts applied in place;
//! - the conflicts that still need a human, in their original order;
//! - an audit trail describing every automatic decision.
//!
//! Resolution rules, applied to each conflict in order:
//!
//! 1. **Execution count** (`auto_resolve_execution_count`): the resolved
//!    cell's count is reset to `None` ("needs re-run").
//! 2. **Outputs** (`strip_outputs`): when current and incoming sources are
//!    identical, the divergence is pure side effect; outputs are cleared and
//!    the count reset.
//! 3. **Whitespace** (`auto_resolve_whitespace`): a `cell-modified`, or a
//!    `cell-added` carrying both sides, whose sources are equal after
//!    normalizing line endings and trailing whitespace. The resolved cell
//!    already holds current's text, so nothing is mutated.
//!
//! Independently, notebook-level kernel/runtime drift is accepted as current
//! (`auto_resolve_kernel_version`), and with `strip_outputs` the cells behind
//! conflicts that remain unresolved have their outputs cleared and count
//! reset, exactly as rule 2 does, so the human edits a clean cell. The input
//! notebooks are never mutated.

use serde::Serialize;

use crate::config::Settings;
use crate::model::{Cell, ConflictType, Notebook, SemanticConflict, Versions};

use super::canonical::{UNDEFINED, canonicalize_opt, normalize_whitespace};

/// Output of [`auto_resolve`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AutoResolveResult {
    /// Conflicts that still need a human decision, in classification order.
    pub remaining_conflicts: Vec<SemanticConflict>,
    /// Number of conflicts resolved by policy.
    pub auto_resolved_count: usize,
    /// Audit trail of every automatic decision.
    pub auto_resolved_descriptions: Vec<String>,
    /// Current (or incoming) with trivial conflicts applied.
    pub resolved_notebook: Notebook,
    /// Whether kernel/runtime metadata drift was accepted automatically.
    pub kernel_auto_resolved: bool,
}

impl AutoResolveResult {
    /// Returns `true` if no conflict needs a human.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.remaining_conflicts.is_empty()
    }
}

/// Apply the auto-resolution policy to `conflicts`.
#[must_use]
pub fn auto_resolve(
    versions: Versions<'_>,
    conflicts: &[SemanticConflict],
    settings: &Settings,
) -> AutoResolveResult {
    let resolved_from_current = versions.current.is_some();
    let mut notebook = versions
        .current
        .or(versions.incoming)
        .or(versions.base)
        .cloned()
        .unwrap_or_default();
    let mut target = ResolvedTarget {
        notebook: &mut notebook,
        from_current: resolved_from_current,
    };

    let mut remaining = Vec::new();
    let mut descriptions = Vec::new();
    let mut resolved_count = 0;

    for conflict in conflicts {
        match try_resolve(conflict, &mut target, settings) {
            Some(description) => {
                tracing::debug!(conflict = %conflict.conflict_type, %description, "auto-resolved");
                descriptions.push(description);
                resolved_count += 1;
            }
            None => remaining.push(conflict.clone()),
        }
    }

    let kernel_auto_resolved =
        settings.auto_resolve_kernel_version && kernel_drift(versions);
    if kernel_auto_resolved {
        descriptions.push(
            "Kernel/runtime metadata differs between current and incoming; kept current"
                .to_owned(),
        );
    }

    if settings.strip_outputs {
        for conflict in &remaining {
            let Some((index, cell)) = target.cell_mut(conflict) else {
                continue;
            };
            if cell.outputs.is_empty() {
                continue;
            }
            cell.clear_outputs();
            descriptions.push(format!(
                "Stripped outputs from cell {index} pending manual resolution ({})",
                conflict.conflict_type
            ));
        }
    }

    AutoResolveResult {
        remaining_conflicts: remaining,
        auto_resolved_count: resolved_count,
        auto_resolved_descriptions: descriptions,
        resolved_notebook: notebook,
        kernel_auto_resolved,
    }
}

/// Try every rule on one conflict; returns the audit entry on success.
fn try_resolve(
    conflict: &SemanticConflict,
    target: &mut ResolvedTarget<'_>,
    settings: &Settings,
) -> Option<String> {
    match conflict.conflict_type {
        ConflictType::ExecutionCountChanged if settings.auto_resolve_execution_count => {
            let (index, cell) = target.cell_mut(conflict)?;
            cell.execution_count = None;
            return Some(format!("Cleared execution count of cell {index}"));
        }
        ConflictType::OutputsChanged if settings.strip_outputs && sources_identical(conflict) => {
            let (index, cell) = target.cell_mut(conflict)?;
            cell.clear_outputs();
            return Some(format!(
                "Stripped diverging outputs of cell {index} (sources identical)"
            ));
        }
        _ => {}
    }

    let whitespace_candidate = match conflict.conflict_type {
        ConflictType::CellModified => true,
        ConflictType::CellAdded => {
            conflict.current_content.is_some() && conflict.incoming_content.is_some()
        }
        _ => false,
    };
    if settings.auto_resolve_whitespace && whitespace_candidate && whitespace_only(conflict) {
        let index = target.index_of(conflict).map_or_else(|| "?".to_owned(), |i| i.to_string());
        return Some(format!(
            "Whitespace-only difference in cell {index} ({})",
            conflict.conflict_type
        ));
    }

    None
}

/// The private copy being resolved, plus which side it was copied from.
struct ResolvedTarget<'a> {
    notebook: &'a mut Notebook,
    from_current: bool,
}

impl ResolvedTarget<'_> {
    /// Index of the conflict's cell in the resolved notebook.
    ///
    /// Prefers the index on the side the notebook was copied from. The other
    /// side's index is only used when the cell found there carries the
    /// conflict's content for that side; otherwise it would point at an
    /// unrelated cell.
    fn index_of(&self, conflict: &SemanticConflict) -> Option<usize> {
        let (own, other, other_content) = if self.from_current {
            (
                conflict.current_index,
                conflict.incoming_index,
                conflict.incoming_content.as_ref(),
            )
        } else {
            (
                conflict.incoming_index,
                conflict.current_index,
                conflict.current_content.as_ref(),
            )
        };
        if own.is_some() {
            return own;
        }
        let index = other?;
        let cell = self.notebook.cells.get(index)?;
        let content = other_content?;
        (cell.cell_type == content.cell_type && cell.source == content.source).then_some(index)
    }

    fn cell_mut(&mut self, conflict: &SemanticConflict) -> Option<(usize, &mut Cell)> {
        let index = self.index_of(conflict)?;
        self.notebook.cells.get_mut(index).map(|cell| (index, cell))
    }
}

fn sources_identical(conflict: &SemanticConflict) -> bool {
    match (&conflict.current_content, &conflict.incoming_content) {
        (Some(c), Some(i)) => c.source == i.source,
        _ => false,
    }
}

fn whitespace_only(conflict: &SemanticConflict) -> bool {
    match (&conflict.current_content, &conflict.incoming_content) {
        (Some(c), Some(i)) => {
            normalize_whitespace(c.source_str()) == normalize_whitespace(i.source_str())
        }
        _ => false,
    }
}

/// Kernel/runtime descriptors differ between current and incoming, and at
/// least one of them differs from base.
fn kernel_drift(versions: Versions<'_>) -> bool {
    let (Some(current), Some(incoming)) = (versions.current, versions.incoming) else {
        return false;
    };
    let cur = kernel_key(Some(current));
    let inc = kernel_key(Some(incoming));
    let base = kernel_key(versions.base);
    cur != inc && (cur != base || inc != base)
}

fn kernel_key(notebook: Option<&Notebook>) -> String {
    notebook.map_or_else(
        || UNDEFINED.to_owned(),
        |nb| {
            let km = nb.kernel_metadata();
            format!(
                "{}|{}",
                canonicalize_opt(km.kernelspec),
                canonicalize_opt(km.language_info)
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::merge::align::align_versions;
    use crate::merge::classify::classify;

    fn all_on() -> Settings {
        Settings::default()
    }

    fn all_off() -> Settings {
        Settings {
            auto_resolve_execution_count: false,
            strip_outputs: false,
            auto_resolve_whitespace: false,
            auto_resolve_kernel_version: false,
        }
    }

    fn resolve(
        base: &Notebook,
        current: &Notebook,
        incoming: &Notebook,
        settings: &Settings,
    ) -> AutoResolveResult {
        let versions = Versions::new(Some(base), Some(current), Some(incoming));
        let conflicts = classify(&align_versions(versions));
        auto_resolve(versions, &conflicts, settings)
    }

    fn nb(cells: Vec<Cell>) -> Notebook {
        Notebook::with_cells(cells)
    }

    #[test]
    fn execution_count_conflict_is_cleared() {
        let base = nb(vec![Cell::code("x").with_execution_count(Some(1))]);
        let cur = nb(vec![Cell::code("x").with_execution_count(Some(2))]);
        let inc = nb(vec![Cell::code("x").with_execution_count(Some(3))]);
        let result = resolve(&base, &cur, &inc, &all_on());
        assert!(result.is_clean());
        assert_eq!(result.auto_resolved_count, 1);
        assert_eq!(result.resolved_notebook.cells[0].execution_count, None);
        // Inputs untouched.
        assert_eq!(cur.cells[0].execution_count, Some(2));
    }

    #[test]
    fn execution_count_conflict_kept_when_policy_off() {
        let base = nb(vec![Cell::code("x").with_execution_count(Some(1))]);
        let cur = nb(vec![Cell::code("x").with_execution_count(Some(2))]);
        let inc = nb(vec![Cell::code("x").with_execution_count(Some(3))]);
        let result = resolve(&base, &cur, &inc, &all_off());
        assert_eq!(result.remaining_conflicts.len(), 1);
        assert_eq!(result.auto_resolved_count, 0);
        assert_eq!(result.resolved_notebook.cells[0].execution_count, Some(2));
    }

    #[test]
    fn output_only_divergence_is_stripped() {
        let base = nb(vec![Cell::code("plot()")]);
        let cur = nb(vec![Cell::code("plot()")
            .with_execution_count(Some(4))
            .with_outputs(vec![json!({"output_type": "display_data", "data": {"a": 1}})])]);
        let inc = nb(vec![Cell::code("plot()")
            .with_execution_count(Some(4))
            .with_outputs(vec![json!({"output_type": "display_data", "data": {"a": 2}})])]);
        let result = resolve(&base, &cur, &inc, &all_on());
        assert!(result.is_clean());
        let cell = &result.resolved_notebook.cells[0];
        assert!(cell.outputs.is_empty());
        assert_eq!(cell.execution_count, None);
    }

    #[test]
    fn outputs_with_source_edits_stay_for_a_human_but_get_sanitized() {
        let base = nb(vec![Cell::code("a = 1")]);
        let cur = nb(vec![Cell::code("a = 10")
            .with_outputs(vec![json!({"output_type": "stream", "text": "10"})])]);
        let inc = nb(vec![Cell::code("a = 100")
            .with_outputs(vec![json!({"output_type": "stream", "text": "100"})])]);
        let result = resolve(&base, &cur, &inc, &all_on());
        let remaining: Vec<_> = result
            .remaining_conflicts
            .iter()
            .map(|c| c.conflict_type)
            .collect();
        assert_eq!(
            remaining,
            vec![ConflictType::CellModified, ConflictType::OutputsChanged]
        );
        assert!(result.resolved_notebook.cells[0].outputs.is_empty());
        assert!(
            result
                .auto_resolved_descriptions
                .iter()
                .any(|d| d.starts_with("Stripped outputs from cell 0"))
        );
        assert_eq!(result.auto_resolved_count, 0);
    }

    #[test]
    fn sanitized_cell_is_stable_under_a_second_run() {
        let out = vec![json!({"output_type": "stream", "text": "45\n"})];
        let cell = Cell::code("plot(x)").with_execution_count(Some(1)).with_outputs(out);
        let base = nb(vec![cell.clone()]);
        let cur = nb(vec![cell.clone().with_metadata("tags", json!(["keep"]))]);
        let inc = nb(vec![cell]);

        let first = resolve(&base, &cur, &inc, &all_on());
        assert_eq!(first.remaining_conflicts.len(), 1);
        assert_eq!(first.remaining_conflicts[0].conflict_type, ConflictType::MetadataChanged);
        let sanitized = &first.resolved_notebook.cells[0];
        assert!(sanitized.outputs.is_empty());
        assert_eq!(sanitized.execution_count, None);

        let second = resolve(&base, &first.resolved_notebook, &inc, &all_on());
        assert_eq!(second.resolved_notebook, first.resolved_notebook);
        let remaining: Vec<_> = second
            .remaining_conflicts
            .iter()
            .map(|c| c.conflict_type)
            .collect();
        assert_eq!(remaining, vec![ConflictType::MetadataChanged]);
    }

    #[test]
    fn whitespace_only_edit_is_resolved() {
        let base = nb(vec![Cell::code("x = 1\ny = 2\n")]);
        let cur = nb(vec![Cell::code("x = 1  \ny = 2\n")]);
        let inc = nb(vec![Cell::code("x = 1\r\ny = 2\r\n\r\n")]);
        let result = resolve(&base, &cur, &inc, &all_on());
        assert!(result.is_clean(), "{:?}", result.remaining_conflicts);
        assert_eq!(result.auto_resolved_count, 1);
        assert_eq!(result.resolved_notebook.cells[0].source_str(), "x = 1  \ny = 2\n");
    }

    #[test]
    fn whitespace_only_dual_add_is_resolved() {
        let base = nb(vec![Cell::code("a")]);
        let cur = nb(vec![Cell::code("a"), Cell::code("new = 1  \n")]);
        let inc = nb(vec![Cell::code("a"), Cell::code("new = 1\r\n")]);
        let versions = Versions::new(Some(&base), Some(&cur), Some(&inc));
        let conflicts = classify(&align_versions(versions));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::CellAdded);
        assert!(conflicts[0].current_content.is_some() && conflicts[0].incoming_content.is_some());

        let result = auto_resolve(versions, &conflicts, &all_on());
        assert!(result.is_clean(), "{:?}", result.remaining_conflicts);
        assert_eq!(result.auto_resolved_count, 1);
        assert_eq!(result.resolved_notebook.cells[1].source_str(), "new = 1  \n");
        assert!(
            result.auto_resolved_descriptions[0].starts_with("Whitespace-only difference in cell 1")
        );

        let off = auto_resolve(versions, &conflicts, &all_off());
        assert_eq!(off.remaining_conflicts, conflicts);
    }

    #[test]
    fn whitespace_policy_off_keeps_conflict() {
        let base = nb(vec![Cell::code("x = 1\ny = 2\n")]);
        let cur = nb(vec![Cell::code("x = 1  \ny = 2\n")]);
        let inc = nb(vec![Cell::code("x = 1\r\ny = 2\r\n")]);
        let result = resolve(&base, &cur, &inc, &all_off());
        assert_eq!(result.remaining_conflicts.len(), 1);
    }

    #[test]
    fn kernel_drift_is_accepted_as_current() {
        let mut base = nb(vec![]);
        base.metadata
            .insert("language_info".into(), json!({"version": "3.10"}));
        let mut cur = base.clone();
        cur.metadata
            .insert("language_info".into(), json!({"version": "3.11"}));
        let mut inc = base.clone();
        inc.metadata
            .insert("language_info".into(), json!({"version": "3.12"}));
        let result = resolve(&base, &cur, &inc, &all_on());
        assert!(result.kernel_auto_resolved);
        assert_eq!(
            result.resolved_notebook.metadata["language_info"],
            json!({"version": "3.11"})
        );
        assert_eq!(result.auto_resolved_count, 0);

        let off = resolve(&base, &cur, &inc, &all_off());
        assert!(!off.kernel_auto_resolved);
    }

    #[test]
    fn resolved_notebook_falls_back_to_incoming() {
        let base = nb(vec![Cell::code("x").with_execution_count(Some(1))]);
        let inc = nb(vec![Cell::code("x").with_execution_count(Some(3))]);
        let versions = Versions::new(Some(&base), None, Some(&inc));
        let conflicts = classify(&align_versions(versions));
        let result = auto_resolve(versions, &conflicts, &all_on());
        assert_eq!(result.resolved_notebook, inc);
    }

    #[test]
    fn cleanup_never_touches_unrelated_cells() {
        // Deleted in current: the incoming index does not address a cell of
        // the resolved copy, so nothing may be stripped.
        let out = vec![json!({"output_type": "stream", "text": "keep"})];
        let a = Cell::code("a").with_outputs(out.clone());
        let b = Cell::code("b").with_outputs(out.clone());
        let base = nb(vec![a.clone(), b.clone()]);
        let cur = nb(vec![b.clone()]);
        let inc = nb(vec![a, b]);
        let result = resolve(&base, &cur, &inc, &all_on());
        assert_eq!(result.remaining_conflicts.len(), 1);
        assert_eq!(result.resolved_notebook.cells[0].outputs, out);
    }
}
