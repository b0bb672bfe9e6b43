//! nbformat JSON reading and writing.
//!
//! Output follows the layout Jupyter itself writes: one-space indentation,
//! keys sorted, non-ASCII text left unescaped, and a trailing newline. A
//! notebook written here and re-read yields an equal [`Notebook`].

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::FormatError;
use crate::types::Notebook;

/// Lowest nbformat major version the codec accepts.
pub const MIN_NBFORMAT: u32 = 4;

/// Parse notebook JSON text.
///
/// # Errors
/// Returns [`FormatError::Json`] for malformed JSON or a document that does
/// not have the nbformat shape, and [`FormatError::UnsupportedVersion`] for
/// nbformat v3 and older.
pub fn parse_notebook(text: &str) -> Result<Notebook, FormatError> {
    let notebook: Notebook = serde_json::from_str(text)?;
    if notebook.nbformat < MIN_NBFORMAT {
        return Err(FormatError::UnsupportedVersion {
            major: notebook.nbformat,
        });
    }
    tracing::trace!(cells = notebook.cells.len(), "parsed notebook");
    Ok(notebook)
}

/// Serialize a notebook to nbformat JSON text.
///
/// # Errors
/// Returns [`FormatError`] if a metadata value cannot be serialized.
pub fn serialize_notebook(notebook: &Notebook) -> Result<String, FormatError> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
    notebook.serialize(&mut serializer)?;
    let mut text = String::from_utf8(buf)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{Cell, CellType};

    const SAMPLE: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "metadata": {},
   "source": ["# Heading\n", "text"]
  },
  {
   "cell_type": "code",
   "execution_count": 3,
   "metadata": {"tags": ["setup"]},
   "outputs": [{"output_type": "stream", "name": "stdout", "text": ["hi\n"]}],
   "source": "print('hi')"
  }
 ],
 "metadata": {"kernelspec": {"name": "python3", "display_name": "Python 3"}},
 "nbformat": 4,
 "nbformat_minor": 5
}"##;

    #[test]
    fn parse_reads_cells_and_metadata() {
        let nb = parse_notebook(SAMPLE).unwrap();
        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.cells[0].cell_type, CellType::Markdown);
        assert_eq!(nb.cells[0].source_str(), "# Heading\ntext");
        assert_eq!(nb.cells[1].execution_count, Some(3));
        assert_eq!(nb.cells[1].outputs.len(), 1);
        assert_eq!(nb.cells[1].metadata["tags"], json!(["setup"]));
        assert!(nb.kernel_metadata().kernelspec.is_some());
    }

    #[test]
    fn serialize_then_parse_is_stable() {
        let nb = parse_notebook(SAMPLE).unwrap();
        let text = serialize_notebook(&nb).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.starts_with("{\n \"cells\": ["));
        assert_eq!(parse_notebook(&text).unwrap(), nb);
    }

    #[test]
    fn rejects_old_nbformat() {
        let err = parse_notebook(r#"{"cells": [], "metadata": {}, "nbformat": 3}"#).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion { major: 3 }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            parse_notebook("{\"cells\": ["),
            Err(FormatError::Json(_))
        ));
    }

    #[test]
    fn rejects_cell_without_type() {
        let text = r#"{"cells": [{"source": "x"}], "metadata": {}, "nbformat": 4}"#;
        assert!(matches!(parse_notebook(text), Err(FormatError::Json(_))));
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let nb = Notebook::with_cells(vec![Cell::markdown("héllo wörld")]);
        let text = serialize_notebook(&nb).unwrap();
        assert!(text.contains("héllo wörld"));
    }
}
