//! nbmerge configuration (`nbmerge.toml`).
//!
//! Defines the typed configuration file and the flat [`Settings`] bundle the
//! auto-resolver consumes. The engine never caches settings: callers load a
//! config once and pass `&Settings` into every call.
//!
//! ```toml
//! [auto_resolve]
//! execution_count = true
//! strip_outputs = false
//! whitespace = true
//! kernel_version = true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Auto-resolution policy flags, as consumed by
/// [`crate::merge::resolve::auto_resolve`]. Every flag defaults to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Reset diverging execution counts to "never run".
    pub auto_resolve_execution_count: bool,
    /// Clear outputs whose divergence is pure side effect, and sanitize the
    /// outputs of cells left for manual resolution.
    pub strip_outputs: bool,
    /// Accept edits that differ only in line endings or trailing whitespace.
    pub auto_resolve_whitespace: bool,
    /// Accept kernel/runtime metadata drift as the current side's.
    pub auto_resolve_kernel_version: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_resolve_execution_count: true,
            strip_outputs: true,
            auto_resolve_whitespace: true,
            auto_resolve_kernel_version: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level nbmerge configuration.
///
/// Missing fields use defaults; a missing file is all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NbMergeConfig {
    /// Auto-resolution policy.
    #[serde(default)]
    pub auto_resolve: AutoResolveConfig,
}

/// The `[auto_resolve]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutoResolveConfig {
    /// See [`Settings::auto_resolve_execution_count`].
    #[serde(default = "default_true")]
    pub execution_count: bool,
    /// See [`Settings::strip_outputs`].
    #[serde(default = "default_true")]
    pub strip_outputs: bool,
    /// See [`Settings::auto_resolve_whitespace`].
    #[serde(default = "default_true")]
    pub whitespace: bool,
    /// See [`Settings::auto_resolve_kernel_version`].
    #[serde(default = "default_true")]
    pub kernel_version: bool,
}

impl Default for AutoResolveConfig {
    fn default() -> Self {
        Self {
            execution_count: true,
            strip_outputs: true,
            whitespace: true,
            kernel_version: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration file could not be read or parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigError {
    /// The file that was being loaded, if any.
    pub path: Option<PathBuf>,
    /// 1-based line of the offending TOML, when the parser located it.
    pub line: Option<usize>,
    /// What went wrong.
    pub message: String,
}

impl ConfigError {
    fn from_toml(text: &str, err: &toml::de::Error) -> Self {
        let line = err
            .span()
            .map(|span| text[..span.start].matches('\n').count() + 1);
        Self {
            path: None,
            line,
            message: err.message().to_owned(),
        }
    }

    fn in_file(self, path: &Path) -> Self {
        Self {
            path: Some(path.to_owned()),
            ..self
        }
    }
}

/// `path:line: message`, like a compiler diagnostic.
impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(p), Some(line)) => write!(f, "{}:{line}: {}", p.display(), self.message),
            (Some(p), None) => write!(f, "{}: {}", p.display(), self.message),
            (None, Some(line)) => write!(f, "config error: line {line}: {}", self.message),
            (None, None) => write!(f, "config error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl NbMergeConfig {
    /// Load `nbmerge.toml` from `path`; an absent file yields the defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` when the file exists but cannot be read, is not
    /// valid TOML, or names a key nbmerge does not know.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file; using defaults");
                return Ok(Self::default());
            }
            read => read.map_err(|e| ConfigError {
                path: Some(path.to_owned()),
                line: None,
                message: format!("could not read file: {e}"),
            })?,
        };
        let config = Self::parse(&text).map_err(|e| e.in_file(path))?;
        tracing::debug!(path = %path.display(), settings = ?config.settings(), "loaded config");
        Ok(config)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    /// Returns `ConfigError`, with the line when known, on invalid TOML or
    /// unknown keys.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::from_toml(text, &e))
    }

    /// The flat policy bundle for the auto-resolver.
    #[must_use]
    pub const fn settings(&self) -> Settings {
        Settings {
            auto_resolve_execution_count: self.auto_resolve.execution_count,
            strip_outputs: self.auto_resolve.strip_outputs,
            auto_resolve_whitespace: self.auto_resolve.whitespace,
            auto_resolve_kernel_version: self.auto_resolve.kernel_version,
        }
    }
}
