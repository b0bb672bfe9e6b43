//! Rendering of command results as text or JSON.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use serde::Serialize;

use crate::merge::MergeAnalysis;
use crate::model::SideFailure;

/// How a command prints its result (`--format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text report for humans
    #[default]
    Text,
    /// Pretty-printed JSON for tools and agents
    Json,
}

fn to_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data).context("JSON serialization failed")?;
    json.push('\n');
    Ok(json)
}

/// Render the notebook paths of `nbmerge git --list`, one per line in text.
pub fn render_paths(paths: &[PathBuf], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(paths),
        OutputFormat::Text => Ok(paths.iter().fold(String::new(), |mut out, p| {
            let _ = writeln!(out, "{}", p.display());
            out
        })),
    }
}

/// JSON payload: the analysis plus any sides that failed to parse.
#[derive(Serialize)]
pub struct Report<'a> {
    /// Sides that were supplied but could not be parsed.
    pub failed_sides: Vec<String>,
    /// The pipeline result.
    #[serde(flatten)]
    pub analysis: &'a MergeAnalysis,
}

impl<'a> Report<'a> {
    /// Bundle an analysis with the parse failures that preceded it.
    pub fn new(analysis: &'a MergeAnalysis, failures: &[SideFailure]) -> Self {
        Self {
            failed_sides: failures.iter().map(ToString::to_string).collect(),
            analysis,
        }
    }

    /// Render in `format`.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => to_json(self),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_text(&self) -> String {
        let analysis = self.analysis;
        let resolution = &analysis.resolution;
        let mut out = String::new();

        for failure in &self.failed_sides {
            let _ = writeln!(out, "warning: {failure}");
        }

        let mut matched = 0;
        let mut single = 0;
        for mapping in &analysis.mappings {
            if mapping.side_count() > 1 {
                matched += 1;
            } else {
                single += 1;
            }
        }
        let _ = writeln!(
            out,
            "{} cell rows ({matched} matched, {single} single-sided)",
            analysis.mappings.len()
        );

        if analysis.conflicts.is_empty() {
            let _ = writeln!(out, "No conflicts detected.");
            return out;
        }

        let _ = writeln!(
            out,
            "{} conflict(s), {} auto-resolved, {} remaining",
            analysis.conflicts.len(),
            resolution.auto_resolved_count,
            resolution.remaining_conflicts.len()
        );

        if !resolution.auto_resolved_descriptions.is_empty() {
            let _ = writeln!(out, "\nAuto-resolved:");
            for line in &resolution.auto_resolved_descriptions {
                let _ = writeln!(out, "  - {line}");
            }
        }

        if !resolution.remaining_conflicts.is_empty() {
            let _ = writeln!(out, "\nNeeds manual resolution:");
            for conflict in &resolution.remaining_conflicts {
                let _ = writeln!(out, "  - {}", conflict.summary());
            }
        }
        out
    }
}
