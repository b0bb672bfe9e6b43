//! Notebook document model and nbformat codec for nbmerge.
//!
//! The merge engine in the root `nbmerge` crate works purely on the value
//! types defined here. Reading and writing `.ipynb` bytes is confined to this
//! crate so the engine itself never touches JSON text.
//!
//! # Crate layout
//!
//! - [`types`]: [`Notebook`], [`Cell`], [`CellType`], [`SourceText`].
//! - [`codec`]: [`parse_notebook`] / [`serialize_notebook`].
//! - [`error`]: the [`FormatError`] enum returned by the codec.

pub mod codec;
pub mod error;
pub mod types;

pub use codec::{parse_notebook, serialize_notebook};
pub use error::FormatError;
pub use types::{Cell, CellType, KernelMetadata, Notebook, SourceText};
