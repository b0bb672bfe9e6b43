//! Error types for nbmerge.
//!
//! Defines [`MergeError`], the error type for the fallible edges of the merge
//! engine: loading the three notebook versions, reading config, and talking
//! to git. The pure pipeline steps (align, classify, resolve) cannot fail.
//!
//! Messages are written for whoever runs the tool: each variant says what went
//! wrong and how to fix it.

use std::fmt;

use nbmerge_format::FormatError;

use crate::config::ConfigError;
use crate::model::Side;

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Unified error type for nbmerge operations.
#[derive(Debug)]
pub enum MergeError {
    /// Fewer than two of the three versions were available, so there is
    /// nothing to merge.
    InsufficientInput {
        /// The sides that were available.
        available: Vec<Side>,
    },

    /// A notebook version could not be parsed.
    Parse {
        /// Which version failed.
        side: Side,
        /// The underlying format error.
        source: FormatError,
    },

    /// A git command failed.
    Git {
        /// The git command that was run (e.g. `"git show :1:a.ipynb"`).
        command: String,
        /// Captured stderr from git.
        stderr: String,
    },

    /// A configuration file could not be loaded or parsed.
    Config(ConfigError),

    /// An I/O error occurred while reading or writing a notebook.
    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientInput { available } => {
                write!(f, "need at least two notebook versions to merge, got ")?;
                if available.is_empty() {
                    write!(f, "none")?;
                } else {
                    let names: Vec<&str> = available.iter().map(|s| s.as_str()).collect();
                    write!(f, "only {}", names.join(", "))?;
                }
                write!(
                    f,
                    "\n  To fix: provide the current and incoming notebooks (base is optional)."
                )
            }
            Self::Parse { side, source } => {
                write!(
                    f,
                    "could not parse {side} notebook: {source}\n  To fix: check that the file is valid nbformat 4 JSON."
                )
            }
            Self::Git { command, stderr } => {
                write!(f, "git command failed: {command}")?;
                if !stderr.is_empty() {
                    write!(f, "\n  stderr: {stderr}")?;
                }
                write!(
                    f,
                    "\n  To fix: check that the path is inside a repository with a merge in progress. Run `git status` for details."
                )
            }
            Self::Config(err) => {
                write!(
                    f,
                    "configuration error: {err}\n  To fix: edit the config file and correct the issue."
                )
            }
            Self::Io(err) => {
                write!(f, "I/O error: {err}\n  To fix: check the path and file permissions.")
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse { source, .. } => Some(source),
            Self::Config(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::InsufficientInput { .. } | Self::Git { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<std::io::Error> for MergeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ConfigError> for MergeError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
