//! Order-independent serialization of JSON values.
//!
//! Two structurally equal objects always canonicalize to the same string no
//! matter what order their keys were inserted in. Arrays keep their order:
//! `[1, 2]` and `[2, 1]` are different values. Every deep-equality check in
//! the engine (cell metadata, outputs, kernel descriptors) goes through here.

use std::fmt::Write as _;

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::model::Cell;

/// Canonical form of an absent value.
pub const UNDEFINED: &str = "undefined";

/// Canonical string form of `value`.
#[must_use]
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Canonical form of an optional value; `None` maps to [`UNDEFINED`], which
/// is distinct from the canonical form of JSON `null`.
#[must_use]
pub fn canonicalize_opt(value: Option<&Value>) -> String {
    value.map_or_else(|| UNDEFINED.to_owned(), canonicalize)
}

/// Canonical form of a JSON object.
#[must_use]
pub fn canonicalize_map(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    write_object(&mut out, map);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        // `Value`'s Display escapes strings exactly like JSON.
        Value::String(_) => {
            let _ = write!(out, "{value}");
        }
        Value::Array(items) => write_array(out, items),
        Value::Object(map) => write_object(out, map),
    }
}

fn write_array(out: &mut String, items: &[Value]) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, item);
    }
    out.push(']');
}

fn write_object(out: &mut String, map: &Map<String, Value>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_unstable();
    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{}", Value::String(key.clone()));
        out.push(':');
        write_value(out, &map[key]);
    }
    out.push('}');
}

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

/// Canonical form of a cell's metadata.
#[must_use]
pub fn cell_metadata(cell: &Cell) -> String {
    canonicalize_map(&cell.metadata)
}

/// Canonical form of a cell's outputs.
#[must_use]
pub fn cell_outputs(cell: &Cell) -> String {
    let mut out = String::new();
    write_array(&mut out, &cell.outputs);
    out
}

/// Content fingerprint used for exact matching: SHA-256 over the canonical
/// form of `{cell_type, source}`.
///
/// Outputs, metadata and execution counts are deliberately left out so a
/// cell that was merely re-run still matches itself exactly; those fields are
/// compared later by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a cell.
    #[must_use]
    pub fn of(cell: &Cell) -> Self {
        Self::hash(cell, cell.source_str())
    }

    /// Fingerprint a cell with its source passed through
    /// [`normalize_whitespace`]. Two cells that differ only in line endings or
    /// trailing whitespace share this fingerprint.
    #[must_use]
    pub fn of_normalized(cell: &Cell) -> Self {
        Self::hash(cell, &normalize_whitespace(cell.source_str()))
    }

    fn hash(cell: &Cell, source: &str) -> Self {
        let canonical = canonicalize(&json!({
            "cell_type": cell.cell_type.as_str(),
            "source": source,
        }));
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hasher.finalize().into())
    }
}

/// Unify line endings to `\n`, strip trailing whitespace from every line and
/// drop trailing blank lines.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = unified.lines().map(str::trim_end).collect();
    lines.join("\n").trim_end().to_owned()
}
