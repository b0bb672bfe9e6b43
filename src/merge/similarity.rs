//! Similarity scoring between cells for the aligner's fuzzy pass.
//!
//! The score is the better of two LCS ratios over the cell source:
//!
//! - **line ratio**: `2 * LCS(lines) / (lines_a + lines_b)`, which rewards
//!   multi-line cells that kept most of their lines. Past a size budget the
//!   LCS is replaced by the order-free multiset overlap of the lines;
//! - **character ratio**: `2 * LCS(chars) / (chars_a + chars_b)`, which
//!   rewards short cells edited in place. For sources too large for a
//!   character-level LCS this falls back to whitespace-token Jaccard.
//!
//! Cells of different types have their score halved. Identical sources score
//! exactly `1.0`; anything else is capped at [`MAX_FUZZY_SCORE`] so an exact
//! match is always distinguishable from a near miss.
//!
//! [`similarity_bound`] gives a cheap upper bound from line and character
//! counts alone, so the aligner can skip pairs that cannot reach
//! [`MIN_SIMILARITY`] without running either LCS.

use std::collections::BTreeMap;

use crate::model::{Cell, CellType};

/// Minimum score for a pairing in the similarity pass.
pub const MIN_SIMILARITY: f64 = 0.5;

/// Upper bound for non-identical sources.
pub const MAX_FUZZY_SCORE: f64 = 0.99;

/// Multiplier applied when the two cells have different types.
pub const TYPE_MISMATCH_PENALTY: f64 = 0.5;

/// Largest `chars_a * chars_b` for which a character LCS is computed.
const CHAR_LCS_BUDGET: usize = 250_000;

/// Largest `lines_a * lines_b` for which a line LCS is computed.
const LINE_LCS_BUDGET: usize = 4_000_000;

/// Similarity of two cells in `[0, 1]`.
#[must_use]
pub fn cell_similarity(a: &Cell, b: &Cell) -> f64 {
    let score = text_similarity(a.source_str(), b.source_str());
    if a.cell_type == b.cell_type {
        score
    } else {
        score * TYPE_MISMATCH_PENALTY
    }
}

/// Similarity of two source strings in `[0, 1]`.
#[must_use]
pub fn text_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lines_a: Vec<&str> = a.lines().collect();
    let lines_b: Vec<&str> = b.lines().collect();
    let line_ratio = if lines_a.len().saturating_mul(lines_b.len()) <= LINE_LCS_BUDGET {
        lcs_ratio(&lines_a, &lines_b)
    } else {
        multiset_dice(&lines_a, &lines_b)
    };

    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();
    let fine_ratio = if chars_a.len().saturating_mul(chars_b.len()) <= CHAR_LCS_BUDGET {
        lcs_ratio(&chars_a, &chars_b)
    } else {
        token_jaccard(a, b)
    };

    line_ratio.max(fine_ratio).min(MAX_FUZZY_SCORE)
}

/// Sizes of a cell's source, enough to bound its similarity to another cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellStats {
    pub cell_type: CellType,
    pub lines: usize,
    pub chars: usize,
}

impl CellStats {
    #[must_use]
    pub fn of(cell: &Cell) -> Self {
        let source = cell.source_str();
        Self {
            cell_type: cell.cell_type,
            lines: source.lines().count(),
            chars: source.chars().count(),
        }
    }
}

/// Upper bound of [`cell_similarity`] for two cells with these stats.
///
/// An LCS can never be longer than the shorter sequence, so each ratio is at
/// most `2 * min / (a + b)`. The token Jaccard fallback has no count-based
/// bound, so a pair over the character budget is bounded by its lines only
/// when that is smaller than 1.
#[must_use]
pub fn similarity_bound(a: &CellStats, b: &CellStats) -> f64 {
    let bound = if a.chars == 0 || b.chars == 0 {
        if a.chars == b.chars { 1.0 } else { 0.0 }
    } else {
        let line_bound = dice_bound(a.lines, b.lines);
        let fine_bound = if a.chars.saturating_mul(b.chars) <= CHAR_LCS_BUDGET {
            dice_bound(a.chars, b.chars)
        } else {
            1.0
        };
        line_bound.max(fine_bound)
    };
    if a.cell_type == b.cell_type {
        bound
    } else {
        bound * TYPE_MISMATCH_PENALTY
    }
}

#[allow(clippy::cast_precision_loss)]
fn dice_bound(a: usize, b: usize) -> f64 {
    let total = a + b;
    if total == 0 {
        return 1.0;
    }
    (2 * a.min(b)) as f64 / total as f64
}

/// `2 * |LCS| / (|a| + |b|)`.
#[allow(clippy::cast_precision_loss)]
fn lcs_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    (2 * lcs_len(a, b)) as f64 / total as f64
}

/// Length of the longest common subsequence, O(|a|·|b|) time, O(|b|) space.
pub(crate) fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `2 * |a ∩ b| / (|a| + |b|)` with multiplicity, ignoring order.
#[allow(clippy::cast_precision_loss)]
fn multiset_dice(a: &[&str], b: &[&str]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for line in a {
        *counts.entry(*line).or_default() += 1;
    }
    let mut shared = 0;
    for line in b {
        if let Some(n) = counts.get_mut(line).filter(|n| **n > 0) {
            *n -= 1;
            shared += 1;
        }
    }
    (2 * shared) as f64 / total as f64
}

#[allow(clippy::cast_precision_loss)]
fn token_jaccard(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}
