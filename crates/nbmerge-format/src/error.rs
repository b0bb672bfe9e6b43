//! Error types for notebook parsing and serialization.

use thiserror::Error;

/// Errors returned by [`parse_notebook`](crate::parse_notebook) and
/// [`serialize_notebook`](crate::serialize_notebook).
#[derive(Debug, Error)]
pub enum FormatError {
    /// The document is not valid JSON, or its shape does not match nbformat
    /// (missing `cells`, a cell without `cell_type`, a non-string source, ...).
    #[error("invalid notebook JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The notebook declares an nbformat major version this crate cannot read.
    #[error("unsupported nbformat version {major} (only v4 and later are supported)")]
    UnsupportedVersion {
        /// The `nbformat` value found in the document.
        major: u32,
    },

    /// Serialized output was not valid UTF-8.
    #[error("serialized notebook is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
