//! Value types for notebook documents.
//!
//! These mirror the nbformat v4 schema closely enough for merging: every
//! field the merge engine compares is typed. Any other key on a cell or
//! notebook is collected into its `extra` map and written back in sorted
//! position, so it survives a parse/serialize round trip.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// CellType
// ---------------------------------------------------------------------------

/// The kind of a notebook cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    /// Executable code. Only code cells carry outputs and an execution count.
    Code,
    /// Markdown prose.
    Markdown,
    /// Raw, unrendered text.
    Raw,
}

impl CellType {
    /// The nbformat spelling of this cell type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Markdown => "markdown",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SourceText
// ---------------------------------------------------------------------------

/// Cell source, normalized to a single string.
///
/// nbformat allows the source to be stored either as one string or as an
/// array of line fragments. Both forms deserialize to the same `SourceText`,
/// so comparisons never see the storage difference. Serialization always
/// emits the line-array form, each line keeping its trailing `\n`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourceText(String);

impl SourceText {
    /// Wrap an already-joined source string.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Join line fragments into one source string.
    #[must_use]
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self(lines.iter().map(AsRef::as_ref).collect())
    }

    /// The canonical joined form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into nbformat line fragments (`"a\n"`, `"b"`).
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.0.split_inclusive('\n').collect()
    }

    /// Returns `true` if the source is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SourceText {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceText {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Text(String),
    Lines(Vec<String>),
}

impl<'de> Deserialize<'de> for SourceText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawSource::deserialize(deserializer)? {
            RawSource::Text(text) => Self(text),
            RawSource::Lines(lines) => Self::from_lines(&lines),
        })
    }
}

impl Serialize for SourceText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.lines().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One notebook cell.
///
/// `outputs` and `execution_count` are only meaningful for code cells; they
/// are ignored (and not serialized) for markdown and raw cells.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Cell {
    /// Code, markdown or raw.
    pub cell_type: CellType,

    /// Normalized source text.
    #[serde(default)]
    pub source: SourceText,

    /// Free-form cell metadata (tags, collapsed state, editor hints, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Rich outputs of the last execution, in display order.
    #[serde(default)]
    pub outputs: Vec<Value>,

    /// Execution counter of the last run, `None` if never run.
    #[serde(default)]
    pub execution_count: Option<i64>,

    /// Cell id (nbformat 4.5+).
    #[serde(default)]
    pub id: Option<String>,

    /// Inline attachments of markdown/raw cells, kept verbatim.
    #[serde(default)]
    pub attachments: Option<Value>,

    /// Keys the schema above does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    /// Create a cell of the given type with empty metadata and no outputs.
    #[must_use]
    pub fn new(cell_type: CellType, source: impl Into<SourceText>) -> Self {
        Self {
            cell_type,
            source: source.into(),
            metadata: Map::new(),
            outputs: Vec::new(),
            execution_count: None,
            id: None,
            attachments: None,
            extra: Map::new(),
        }
    }

    /// Create a code cell.
    #[must_use]
    pub fn code(source: impl Into<SourceText>) -> Self {
        Self::new(CellType::Code, source)
    }

    /// Create a markdown cell.
    #[must_use]
    pub fn markdown(source: impl Into<SourceText>) -> Self {
        Self::new(CellType::Markdown, source)
    }

    /// Create a raw cell.
    #[must_use]
    pub fn raw(source: impl Into<SourceText>) -> Self {
        Self::new(CellType::Raw, source)
    }

    /// Set the execution count.
    #[must_use]
    pub fn with_execution_count(mut self, count: Option<i64>) -> Self {
        self.execution_count = count;
        self
    }

    /// Replace the outputs.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Value>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Insert one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns `true` for code cells.
    #[must_use]
    pub fn is_code(&self) -> bool {
        self.cell_type == CellType::Code
    }

    /// The normalized source string.
    #[must_use]
    pub fn source_str(&self) -> &str {
        self.source.as_str()
    }

    /// Drop outputs and reset the execution count to "never run".
    pub fn clear_outputs(&mut self) {
        self.outputs.clear();
        self.execution_count = None;
    }
}

impl Cell {
    const KEYS: [&'static str; 7] = [
        "attachments",
        "cell_type",
        "execution_count",
        "id",
        "metadata",
        "outputs",
        "source",
    ];

    fn serialize_field<M: SerializeMap>(&self, key: &str, map: &mut M) -> Result<(), M::Error> {
        match key {
            "attachments" => {
                if let Some(attachments) = &self.attachments {
                    map.serialize_entry(key, attachments)?;
                }
            }
            "cell_type" => map.serialize_entry(key, &self.cell_type)?,
            "execution_count" if self.is_code() => map.serialize_entry(key, &self.execution_count)?,
            "id" => {
                if let Some(id) = &self.id {
                    map.serialize_entry(key, id)?;
                }
            }
            "metadata" => map.serialize_entry(key, &self.metadata)?,
            "outputs" if self.is_code() => map.serialize_entry(key, &self.outputs)?,
            "source" => map.serialize_entry(key, &self.source)?,
            _ => {}
        }
        Ok(())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Code-only keys only on code cells.
        serialize_sorted(serializer, &Self::KEYS, &self.extra, |key, map| {
            self.serialize_field(key, map)
        })
    }
}

/// Write a JSON object in lexical key order: the typed fields named by
/// `known` (sorted) through `field`, interleaved with the `extra` entries.
fn serialize_sorted<S, F>(
    serializer: S,
    known: &[&str],
    extra: &Map<String, Value>,
    mut field: F,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    F: FnMut(&str, &mut S::SerializeMap) -> Result<(), S::Error>,
{
    let mut unknown: Vec<(&String, &Value)> = extra
        .iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .collect();
    unknown.sort_unstable_by(|a, b| a.0.cmp(b.0));
    let mut unknown = unknown.into_iter().peekable();

    let mut map = serializer.serialize_map(None)?;
    for &key in known {
        while let Some((k, v)) = unknown.next_if(|(k, _)| k.as_str() < key) {
            map.serialize_entry(k, v)?;
        }
        field(key, &mut map)?;
    }
    for (k, v) in unknown {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

// ---------------------------------------------------------------------------
// Notebook
// ---------------------------------------------------------------------------

/// A whole notebook document: ordered cells plus notebook-level metadata.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Notebook {
    /// Cells in document order.
    pub cells: Vec<Cell>,

    /// Notebook-level metadata (`kernelspec`, `language_info`, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// nbformat major version.
    pub nbformat: u32,

    /// nbformat minor version.
    #[serde(default)]
    pub nbformat_minor: u32,

    /// Top-level keys the schema above does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Serialize for Notebook {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const KEYS: [&str; 4] = ["cells", "metadata", "nbformat", "nbformat_minor"];
        serialize_sorted(serializer, &KEYS, &self.extra, |key, map| match key {
            "cells" => map.serialize_entry(key, &self.cells),
            "metadata" => map.serialize_entry(key, &self.metadata),
            "nbformat" => map.serialize_entry(key, &self.nbformat),
            "nbformat_minor" => map.serialize_entry(key, &self.nbformat_minor),
            _ => Ok(()),
        })
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: 4,
            nbformat_minor: 5,
            extra: Map::new(),
        }
    }
}

impl Notebook {
    /// Create an nbformat 4.5 notebook holding `cells`.
    #[must_use]
    pub fn with_cells(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    /// The kernel and language runtime descriptors from the notebook metadata.
    #[must_use]
    pub fn kernel_metadata(&self) -> KernelMetadata<'_> {
        KernelMetadata {
            kernelspec: self.metadata.get("kernelspec"),
            language_info: self.metadata.get("language_info"),
        }
    }
}

/// Borrowed view of the runtime-describing parts of notebook metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelMetadata<'a> {
    /// The `kernelspec` block (kernel name, display name, language).
    pub kernelspec: Option<&'a Value>,
    /// The `language_info` block (language version, codemirror mode, ...).
    pub language_info: Option<&'a Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn source_string_and_line_array_normalize_identically() {
        let a: SourceText = serde_json::from_value(json!("x = 1\ny = 2\n")).unwrap();
        let b: SourceText = serde_json::from_value(json!(["x = 1\n", "y = 2\n"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "x = 1\ny = 2\n");
    }

    #[test]
    fn source_serializes_as_line_fragments() {
        let src = SourceText::new("a\nb");
        assert_eq!(serde_json::to_value(&src).unwrap(), json!(["a\n", "b"]));
        assert_eq!(serde_json::to_value(SourceText::default()).unwrap(), json!([]));
    }

    #[test]
    fn markdown_cell_omits_code_only_fields() {
        let value = serde_json::to_value(Cell::markdown("# Title")).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("outputs"));
        assert!(!obj.contains_key("execution_count"));
        assert_eq!(obj["cell_type"], json!("markdown"));
    }

    #[test]
    fn code_cell_always_carries_execution_count_and_outputs() {
        let value = serde_json::to_value(Cell::code("1 + 1")).unwrap();
        assert_eq!(value["execution_count"], Value::Null);
        assert_eq!(value["outputs"], json!([]));
    }

    #[test]
    fn clear_outputs_resets_execution_count() {
        let mut cell = Cell::code("print(1)")
            .with_execution_count(Some(4))
            .with_outputs(vec![json!({"output_type": "stream", "text": "1\n"})]);
        cell.clear_outputs();
        assert!(cell.outputs.is_empty());
        assert_eq!(cell.execution_count, None);
    }

    #[test]
    fn unknown_cell_keys_are_kept_in_sorted_position() {
        let cell: Cell = serde_json::from_value(json!({
            "cell_type": "code",
            "source": "x",
            "deletable": false,
            "zz_tool": {"pinned": true},
        }))
        .unwrap();
        assert_eq!(cell.extra["deletable"], json!(false));
        assert_eq!(cell.extra["zz_tool"], json!({"pinned": true}));

        let text = serde_json::to_string(&cell).unwrap();
        assert_eq!(
            text,
            r#"{"cell_type":"code","deletable":false,"execution_count":null,"metadata":{},"outputs":[],"source":["x"],"zz_tool":{"pinned":true}}"#
        );
    }

    #[test]
    fn extra_entries_never_shadow_typed_fields() {
        let mut cell = Cell::markdown("# T");
        cell.extra.insert("source".into(), json!("other"));
        let value = serde_json::to_value(&cell).unwrap();
        assert_eq!(value["source"], json!(["# T"]));
    }

    #[test]
    fn unknown_notebook_keys_survive() {
        let nb: Notebook = serde_json::from_value(json!({
            "cells": [],
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 5,
            "authors": ["ada"],
        }))
        .unwrap();
        assert_eq!(nb.extra["authors"], json!(["ada"]));
        let text = serde_json::to_string(&nb).unwrap();
        assert_eq!(
            text,
            r#"{"authors":["ada"],"cells":[],"metadata":{},"nbformat":4,"nbformat_minor":5}"#
        );
    }

    #[test]
    fn kernel_metadata_reads_both_blocks() {
        let mut nb = Notebook::default();
        nb.metadata
            .insert("kernelspec".into(), json!({"name": "python3"}));
        let km = nb.kernel_metadata();
        assert_eq!(km.kernelspec, Some(&json!({"name": "python3"})));
        assert_eq!(km.language_info, None);
    }
}
