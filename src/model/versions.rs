//! The three input versions of a notebook merge.
//!
//! Any side may be missing: git has no base for an add/add conflict, and a
//! side whose text fails to parse is dropped rather than aborting the merge.
//! [`ThreeWayNotebooks::from_texts`] parses each side independently and
//! records which ones failed, so callers can tell "no conflicts" apart from
//! "a side could not be read".

use std::fmt;

use serde::Serialize;

use nbmerge_format::{FormatError, parse_notebook};

use super::Notebook;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One of the three versions taking part in a merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The common ancestor.
    Base,
    /// The local version ("ours").
    Current,
    /// The version being merged in ("theirs").
    Incoming,
}

impl Side {
    /// All sides, in base/current/incoming order.
    pub const ALL: [Self; 3] = [Self::Base, Self::Current, Self::Incoming];

    /// Lowercase name of the side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Current => "current",
            Self::Incoming => "incoming",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Borrowed view of the (optional) three notebooks of a merge.
#[derive(Clone, Copy, Debug, Default)]
pub struct Versions<'a> {
    /// Common ancestor.
    pub base: Option<&'a Notebook>,
    /// Local version.
    pub current: Option<&'a Notebook>,
    /// Version being merged in.
    pub incoming: Option<&'a Notebook>,
}

impl<'a> Versions<'a> {
    /// Bundle three optional notebooks.
    #[must_use]
    pub const fn new(
        base: Option<&'a Notebook>,
        current: Option<&'a Notebook>,
        incoming: Option<&'a Notebook>,
    ) -> Self {
        Self {
            base,
            current,
            incoming,
        }
    }

    /// The notebook for `side`, if present.
    #[must_use]
    pub const fn get(&self, side: Side) -> Option<&'a Notebook> {
        match side {
            Side::Base => self.base,
            Side::Current => self.current,
            Side::Incoming => self.incoming,
        }
    }

    /// Sides that are present, in base/current/incoming order.
    #[must_use]
    pub fn available(&self) -> Vec<Side> {
        Side::ALL
            .into_iter()
            .filter(|side| self.get(*side).is_some())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ThreeWayNotebooks
// ---------------------------------------------------------------------------

/// A side whose text was supplied but could not be parsed.
#[derive(Debug)]
pub struct SideFailure {
    /// Which version failed.
    pub side: Side,
    /// Why it failed.
    pub error: FormatError,
}

impl fmt::Display for SideFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} version failed to parse: {}", self.side, self.error)
    }
}

/// Owned, parsed versions of a merge plus the per-side parse failures.
#[derive(Debug, Default)]
pub struct ThreeWayNotebooks {
    /// Parsed common ancestor.
    pub base: Option<Notebook>,
    /// Parsed local version.
    pub current: Option<Notebook>,
    /// Parsed incoming version.
    pub incoming: Option<Notebook>,
    /// Sides whose text was present but unparsable.
    pub failures: Vec<SideFailure>,
}

impl ThreeWayNotebooks {
    /// Parse each side that has text. A side that fails to parse is left
    /// `None` and recorded in `failures`; the other sides are unaffected.
    #[must_use]
    pub fn from_texts(base: Option<&str>, current: Option<&str>, incoming: Option<&str>) -> Self {
        let mut out = Self::default();
        for (side, text) in [
            (Side::Base, base),
            (Side::Current, current),
            (Side::Incoming, incoming),
        ] {
            let Some(text) = text else { continue };
            match parse_notebook(text) {
                Ok(nb) => *out.slot(side) = Some(nb),
                Err(error) => {
                    tracing::warn!(%side, %error, "notebook side failed to parse");
                    out.failures.push(SideFailure { side, error });
                }
            }
        }
        out
    }

    fn slot(&mut self, side: Side) -> &mut Option<Notebook> {
        match side {
            Side::Base => &mut self.base,
            Side::Current => &mut self.current,
            Side::Incoming => &mut self.incoming,
        }
    }

    /// Borrow the parsed sides.
    #[must_use]
    pub fn versions(&self) -> Versions<'_> {
        Versions::new(
            self.base.as_ref(),
            self.current.as_ref(),
            self.incoming.as_ref(),
        )
    }

    /// Returns `true` if any supplied side failed to parse.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_NB: &str = r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;

    #[test]
    fn unparsable_side_is_recorded_and_others_survive() {
        let nbs = ThreeWayNotebooks::from_texts(Some(EMPTY_NB), Some("not json"), Some(EMPTY_NB));
        assert!(nbs.base.is_some());
        assert!(nbs.current.is_none());
        assert!(nbs.incoming.is_some());
        assert_eq!(nbs.failures.len(), 1);
        assert_eq!(nbs.failures[0].side, Side::Current);
        assert_eq!(
            nbs.versions().available(),
            vec![Side::Base, Side::Incoming]
        );
    }

    #[test]
    fn absent_side_is_not_a_failure() {
        let nbs = ThreeWayNotebooks::from_texts(None, Some(EMPTY_NB), Some(EMPTY_NB));
        assert!(!nbs.has_failures());
        assert_eq!(nbs.versions().available().len(), 2);
    }
}
