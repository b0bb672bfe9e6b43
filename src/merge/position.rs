//! Presentation order for alignment rows.
//!
//! Each row is anchored on the first side that gives it a position, base
//! preferred: `base ?? current ?? incoming ?? 0`. Rows with equal anchors are
//! ordered by incoming index, then current index, then base index, with an
//! absent index sorting after every present one. The comparison is total, so
//! the order is deterministic even for rows that share no side.

use std::cmp::Ordering;

/// The indices a row occupies on each side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RowPosition {
    /// Base index.
    pub base: Option<usize>,
    /// Current index.
    pub current: Option<usize>,
    /// Incoming index.
    pub incoming: Option<usize>,
}

impl RowPosition {
    /// The anchor position: first defined index, base preferred.
    #[must_use]
    pub fn anchor(&self) -> usize {
        self.base.or(self.current).or(self.incoming).unwrap_or(0)
    }
}

// Absent indices compare as +infinity.
fn cmp_missing_last(a: Option<usize>, b: Option<usize>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl PartialOrd for RowPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.anchor()
            .cmp(&other.anchor())
            .then_with(|| cmp_missing_last(self.incoming, other.incoming))
            .then_with(|| cmp_missing_last(self.current, other.current))
            .then_with(|| cmp_missing_last(self.base, other.base))
    }
}

/// Sort `rows` into presentation order. Stable for rows with identical
/// positions.
pub fn sort_by_position<T, F>(rows: &mut [T], position_of: F)
where
    F: Fn(&T) -> RowPosition,
{
    rows.sort_by(|a, b| position_of(a).cmp(&position_of(b)));
}
