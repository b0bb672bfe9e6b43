//! Integration tests for notebook merge scenarios.
//!
//! Drives the public pipeline (`align` → `classify` → `auto_resolve`, and
//! `analyze` which chains them) over small hand-built notebooks.
//!
//! Coverage:
//! - pure addition on one side
//! - divergent edit of the same cell
//! - identical dual-add whose outputs drifted
//! - execution-count drift auto-resolved
//! - whitespace-only divergence auto-resolved
//! - reorder boundary (one side swaps, neither side swaps)
//! - kernel drift accepted as current
//! - missing and unparsable sides

#![allow(clippy::all, clippy::pedantic, clippy::nursery, clippy::unwrap_used)]

use serde_json::json;

use nbmerge::merge::{align, analyze, auto_resolve, classify, has_reordering};
use nbmerge::model::{Cell, ConflictType, Notebook, Side, ThreeWayNotebooks, Versions};
use nbmerge::{MergeError, Settings};

fn nb(cells: Vec<Cell>) -> Notebook {
    Notebook::with_cells(cells)
}

fn analyze3(base: &Notebook, current: &Notebook, incoming: &Notebook) -> nbmerge::merge::MergeAnalysis {
    analyze(
        Versions::new(Some(base), Some(current), Some(incoming)),
        &Settings::default(),
    )
    .unwrap()
}

fn types(conflicts: &[nbmerge::model::SemanticConflict]) -> Vec<ConflictType> {
    conflicts.iter().map(|c| c.conflict_type).collect()
}

#[test]
fn pure_addition_in_incoming() {
    let base = vec![Cell::markdown("M")];
    let incoming = vec![Cell::markdown("M"), Cell::code("N")];

    let mappings = align(Some(&base), Some(&base), Some(&incoming));
    assert_eq!(mappings.len(), 2);

    let m = &mappings[0];
    assert_eq!((m.base_index, m.current_index, m.incoming_index), (Some(0), Some(0), Some(0)));
    assert!((m.match_confidence - 1.0).abs() < f64::EPSILON);

    let n = &mappings[1];
    assert_eq!((n.base_index, n.current_index, n.incoming_index), (None, None, Some(1)));

    let conflicts = classify(&mappings);
    assert_eq!(types(&conflicts), vec![ConflictType::CellAdded]);
    assert_eq!(conflicts[0].incoming_index, Some(1));
}

#[test]
fn divergent_edit_keeps_all_snapshots() {
    let analysis = analyze3(
        &nb(vec![Cell::code("x=ORIGINAL")]),
        &nb(vec![Cell::code("x=LOCAL")]),
        &nb(vec![Cell::code("x=REMOTE")]),
    );
    assert_eq!(types(&analysis.conflicts), vec![ConflictType::CellModified]);
    let c = &analysis.conflicts[0];
    assert_eq!(c.base_content.as_ref().unwrap().source_str(), "x=ORIGINAL");
    assert_eq!(c.current_content.as_ref().unwrap().source_str(), "x=LOCAL");
    assert_eq!(c.incoming_content.as_ref().unwrap().source_str(), "x=REMOTE");

    // Nothing trivial about it.
    assert_eq!(analysis.resolution.remaining_conflicts.len(), 1);
    assert_eq!(analysis.resolution.auto_resolved_count, 0);
}

#[test]
fn identical_dual_add_reports_output_drift_only() {
    let base = nb(vec![Cell::markdown("# Report")]);
    let current = nb(vec![
        Cell::markdown("# Report"),
        Cell::code("df.describe()")
            .with_execution_count(Some(3))
            .with_outputs(vec![json!({"output_type": "execute_result", "data": {"text/plain": "a"}})]),
    ]);
    let incoming = nb(vec![
        Cell::markdown("# Report"),
        Cell::code("df.describe()")
            .with_execution_count(Some(3))
            .with_outputs(vec![json!({"output_type": "execute_result", "data": {"text/plain": "b"}})]),
    ]);

    let analysis = analyze3(&base, &current, &incoming);
    assert_eq!(types(&analysis.conflicts), vec![ConflictType::OutputsChanged]);

    // Sources are identical, so the drift is pure side effect.
    assert!(analysis.is_clean());
    assert!(analysis.resolution.resolved_notebook.cells[1].outputs.is_empty());
}

#[test]
fn execution_count_drift_is_auto_resolved() {
    let analysis = analyze3(
        &nb(vec![Cell::code("fit()").with_execution_count(Some(1))]),
        &nb(vec![Cell::code("fit()").with_execution_count(Some(2))]),
        &nb(vec![Cell::code("fit()").with_execution_count(Some(3))]),
    );
    assert_eq!(types(&analysis.conflicts), vec![ConflictType::ExecutionCountChanged]);
    assert!(
        analysis
            .resolution
            .remaining_conflicts
            .iter()
            .all(|c| c.conflict_type != ConflictType::ExecutionCountChanged)
    );
    assert!(analysis.resolution.auto_resolved_count >= 1);
    assert_eq!(analysis.resolution.resolved_notebook.cells[0].execution_count, None);
}

#[test]
fn execution_count_drift_survives_when_policy_disabled() {
    let settings = Settings {
        auto_resolve_execution_count: false,
        ..Settings::default()
    };
    let base = nb(vec![Cell::code("fit()").with_execution_count(Some(1))]);
    let current = nb(vec![Cell::code("fit()").with_execution_count(Some(2))]);
    let incoming = nb(vec![Cell::code("fit()").with_execution_count(Some(3))]);
    let analysis = analyze(
        Versions::new(Some(&base), Some(&current), Some(&incoming)),
        &settings,
    )
    .unwrap();
    assert_eq!(
        types(&analysis.resolution.remaining_conflicts),
        vec![ConflictType::ExecutionCountChanged]
    );
}

#[test]
fn whitespace_only_divergence_is_auto_resolved() {
    let analysis = analyze3(
        &nb(vec![Cell::code("total = compute(a, b)\n")]),
        &nb(vec![Cell::code("total = compute(a, b, c)   \n")]),
        &nb(vec![Cell::code("total = compute(a, b, c)\r\n")]),
    );
    assert_eq!(types(&analysis.conflicts), vec![ConflictType::CellModified]);
    assert!(analysis.is_clean());
    assert_eq!(analysis.resolution.auto_resolved_count, 1);
    // The resolved cell keeps current's text verbatim.
    assert_eq!(
        analysis.resolution.resolved_notebook.cells[0].source_str(),
        "total = compute(a, b, c)   \n"
    );
}

#[test]
fn reorder_boundary() {
    let abc = vec![Cell::code("A"), Cell::code("B"), Cell::code("C")];
    let bac = vec![Cell::code("B"), Cell::code("A"), Cell::code("C")];

    let swapped = align(Some(&abc), Some(&bac), Some(&abc));
    assert!(has_reordering(&swapped));
    assert_eq!(types(&classify(&swapped))[0], ConflictType::CellReordered);

    let kept = align(Some(&abc), Some(&abc), Some(&abc));
    assert!(!has_reordering(&kept));
    assert!(classify(&kept).is_empty());
}

#[test]
fn kernel_drift_is_accepted_as_current() {
    let mut base = nb(vec![Cell::code("x")]);
    base.metadata
        .insert("kernelspec".to_owned(), json!({"name": "python3", "display_name": "Python 3"}));
    let mut current = base.clone();
    current
        .metadata
        .insert("language_info".to_owned(), json!({"name": "python", "version": "3.11.4"}));
    let mut incoming = base.clone();
    incoming
        .metadata
        .insert("language_info".to_owned(), json!({"name": "python", "version": "3.12.1"}));

    let analysis = analyze3(&base, &current, &incoming);
    assert!(analysis.conflicts.is_empty());
    assert!(analysis.resolution.kernel_auto_resolved);
    assert_eq!(analysis.resolution.resolved_notebook.metadata, current.metadata);
    assert!(
        analysis
            .resolution
            .auto_resolved_descriptions
            .iter()
            .any(|d| d.contains("Kernel"))
    );
}

#[test]
fn inputs_are_never_mutated() {
    let base = nb(vec![Cell::code("x").with_execution_count(Some(1))]);
    let current = nb(vec![Cell::code("x").with_execution_count(Some(2))]);
    let incoming = nb(vec![Cell::code("x").with_execution_count(Some(3))]);
    let before = (base.clone(), current.clone(), incoming.clone());

    let versions = Versions::new(Some(&base), Some(&current), Some(&incoming));
    let conflicts = classify(&nbmerge::merge::align_versions(versions));
    let result = auto_resolve(versions, &conflicts, &Settings::default());

    assert_eq!(result.resolved_notebook.cells[0].execution_count, None);
    assert_eq!((base, current, incoming), before);
}

#[test]
fn only_one_side_is_insufficient_input() {
    let only = nb(vec![Cell::code("x")]);
    let err = analyze(Versions::new(Some(&only), None, None), &Settings::default()).unwrap_err();
    assert!(matches!(
        err,
        MergeError::InsufficientInput { ref available } if available == &[Side::Base]
    ));
}

#[test]
fn unparsable_side_is_dropped_not_fatal() {
    let text = nbmerge_format::serialize_notebook(&nb(vec![Cell::code("x = 1")])).unwrap();
    let notebooks = ThreeWayNotebooks::from_texts(Some("{not json"), Some(&text), Some(&text));

    assert!(notebooks.has_failures());
    assert_eq!(notebooks.failures.len(), 1);
    assert_eq!(notebooks.failures[0].side, Side::Base);
    assert!(notebooks.base.is_none());

    // Two sides still parse, so the merge runs on them.
    let analysis = analyze(notebooks.versions(), &Settings::default()).unwrap();
    assert!(analysis.conflicts.is_empty());
    assert!(analysis.mappings.iter().all(|m| m.base_index.is_none()));
}

#[test]
fn unparsable_sides_can_leave_too_little_to_merge() {
    let text = nbmerge_format::serialize_notebook(&nb(vec![Cell::code("x = 1")])).unwrap();
    let notebooks = ThreeWayNotebooks::from_texts(None, Some(&text), Some("[]"));
    assert_eq!(notebooks.failures.len(), 1);
    assert!(matches!(
        analyze(notebooks.versions(), &Settings::default()),
        Err(MergeError::InsufficientInput { .. })
    ));
}
