//! nbmerge library crate.
//!
//! Three-way, cell-aware merging for Jupyter notebooks. The engine is a set
//! of pure functions over parsed documents:
//!
//! ```text
//! base / current / incoming notebooks
//!   └── merge::align            → Vec<CellMapping>
//!         ├── merge::reorder    → at most one cell-reordered conflict
//!         └── merge::classify   → Vec<SemanticConflict>
//!               └── merge::resolve (+ Settings) → AutoResolveResult
//! ```
//!
//! [`merge::analyze`] runs the whole pipeline. Reading the three versions
//! from git ([`git`]) and parsing them ([`model::versions`]) happen before
//! the engine is entered; the engine itself performs no I/O.

pub mod config;
pub mod error;
pub mod format;
pub mod git;
pub mod merge;
pub mod model;
pub mod telemetry;

pub use config::{NbMergeConfig, Settings};
pub use error::MergeError;
