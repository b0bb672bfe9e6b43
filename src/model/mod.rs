//! nbmerge data model: alignment rows, semantic conflicts, and the three
//! input versions.
//!
//! The notebook document types themselves live in the `nbmerge-format`
//! crate and are re-exported here.

pub mod conflict;
pub mod mapping;
pub mod versions;

pub use conflict::{ConflictType, SemanticConflict};
pub use mapping::CellMapping;
pub use nbmerge_format::{Cell, CellType, KernelMetadata, Notebook, SourceText};
pub use versions::{Side, SideFailure, ThreeWayNotebooks, Versions};
