//! ALIGN step: pair up the cells of base, current and incoming.
//!
//! Produces one [`CellMapping`] per logical cell. Alignment is done pairwise
//! with base as the hub:
//!
//! 1. base ↔ current and base ↔ incoming are matched independently;
//! 2. current ↔ incoming is matched among the cells neither side could pair
//!    with base (cells added on both sides), or directly when base is absent;
//! 3. everything still unpaired becomes a single-side row.
//!
//! Each pairwise match runs four passes over the cells still free:
//!
//! - **exact**: equal [`Fingerprint`]s. An LCS over fingerprints pairs the
//!   order-preserving matches first, then leftover duplicates are paired by
//!   lowest index (these are moved cells). Confidence `1.0`.
//! - **normalized**: the same two steps over [`Fingerprint::of_normalized`],
//!   so cells that differ only in line endings or trailing whitespace pair
//!   without any scoring. Confidence [`MAX_FUZZY_SCORE`].
//! - **similarity**: candidates scoring at least [`MIN_SIMILARITY`], best
//!   first, ties broken by lower index. Pairs whose [`similarity_bound`]
//!   is already below the threshold are never scored. Pairings that do not
//!   cross an already accepted pair are taken first; crossing ones only
//!   afterwards.
//! - **positional**: within each gap between consecutive order-preserving
//!   pairs, remaining cells of the same type are paired in order. This is
//!   the "replace hunk" case of a line diff: a cell rewritten beyond
//!   recognition at the same position is still an edit, not a delete plus an
//!   add. Confidence is the similarity score, however low.
//!
//! The passes are greedy rather than a global optimum (a weighted bipartite
//! matching would align better at higher cost). Everything is deterministic:
//! the same inputs always produce the same rows.

use crate::model::{Cell, CellMapping, Versions};

use super::canonical::Fingerprint;
use super::position::{RowPosition, sort_by_position};
use super::similarity::{
    CellStats, MAX_FUZZY_SCORE, MIN_SIMILARITY, cell_similarity, similarity_bound,
};

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Align up to three cell sequences.
///
/// A `None` side (missing or unparsable document) simply contributes no
/// indices. Every cell of every present side appears in exactly one returned
/// mapping, and no mapping is empty. Rows come back in
/// [`sort_by_position`] order.
#[must_use]
pub fn align(
    base: Option<&[Cell]>,
    current: Option<&[Cell]>,
    incoming: Option<&[Cell]>,
) -> Vec<CellMapping> {
    let base_seq = base.map(CellSeq::new);
    let current_seq = current.map(CellSeq::new);
    let incoming_seq = incoming.map(CellSeq::new);

    let mut rows: Vec<Row> = Vec::new();
    let mut current_placed = vec![false; current.map_or(0, <[Cell]>::len)];
    let mut incoming_placed = vec![false; incoming.map_or(0, <[Cell]>::len)];

    // Hub: every base cell gets a row; partners attach to it.
    if let Some(base_seq) = &base_seq {
        let base_free = vec![true; base_seq.len()];
        let mut by_base: Vec<Row> = (0..base_seq.len())
            .map(|i| Row {
                base: Some(i),
                ..Row::default()
            })
            .collect();

        if let Some(current_seq) = &current_seq {
            let free = vec![true; current_seq.len()];
            for p in match_pair(base_seq, &base_free, current_seq, &free, &[]) {
                by_base[p.a].current = Some(p.b);
                by_base[p.a].confidence = by_base[p.a].confidence.min(p.score);
                current_placed[p.b] = true;
            }
        }
        if let Some(incoming_seq) = &incoming_seq {
            let free = vec![true; incoming_seq.len()];
            for p in match_pair(base_seq, &base_free, incoming_seq, &free, &[]) {
                by_base[p.a].incoming = Some(p.b);
                by_base[p.a].confidence = by_base[p.a].confidence.min(p.score);
                incoming_placed[p.b] = true;
            }
        }
        rows.extend(by_base);
    }

    // Cells both sides added (or everything, when base is absent).
    if let (Some(current_seq), Some(incoming_seq)) = (&current_seq, &incoming_seq) {
        let current_free: Vec<bool> = current_placed.iter().map(|p| !p).collect();
        let incoming_free: Vec<bool> = incoming_placed.iter().map(|p| !p).collect();
        let anchors: Vec<(usize, usize)> = rows
            .iter()
            .filter_map(|r| Some((r.current?, r.incoming?)))
            .collect();
        for p in match_pair(
            current_seq,
            &current_free,
            incoming_seq,
            &incoming_free,
            &anchors,
        ) {
            rows.push(Row {
                base: None,
                current: Some(p.a),
                incoming: Some(p.b),
                confidence: p.score,
            });
            current_placed[p.a] = true;
            incoming_placed[p.b] = true;
        }
    }

    // Singletons: additions on one side.
    for (i, placed) in current_placed.iter().enumerate() {
        if !placed {
            rows.push(Row {
                current: Some(i),
                ..Row::default()
            });
        }
    }
    for (i, placed) in incoming_placed.iter().enumerate() {
        if !placed {
            rows.push(Row {
                incoming: Some(i),
                ..Row::default()
            });
        }
    }

    sort_by_position(&mut rows, Row::position);

    let mappings: Vec<CellMapping> = rows
        .into_iter()
        .map(|r| CellMapping {
            base_index: r.base,
            current_index: r.current,
            incoming_index: r.incoming,
            base_cell: r.base.and_then(|i| base.and_then(|cells| cells.get(i)).cloned()),
            current_cell: r
                .current
                .and_then(|i| current.and_then(|cells| cells.get(i)).cloned()),
            incoming_cell: r
                .incoming
                .and_then(|i| incoming.and_then(|cells| cells.get(i)).cloned()),
            match_confidence: r.confidence,
        })
        .collect();

    debug_assert!(mappings.iter().all(|m| m.side_count() > 0));
    tracing::debug!(rows = mappings.len(), "aligned notebook cells");
    mappings
}

/// Align the cells of whichever notebooks are present.
#[must_use]
pub fn align_versions(versions: Versions<'_>) -> Vec<CellMapping> {
    align(
        versions.base.map(|nb| nb.cells.as_slice()),
        versions.current.map(|nb| nb.cells.as_slice()),
        versions.incoming.map(|nb| nb.cells.as_slice()),
    )
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// A row under construction.
#[derive(Clone, Copy, Debug)]
struct Row {
    base: Option<usize>,
    current: Option<usize>,
    incoming: Option<usize>,
    confidence: f64,
}

impl Default for Row {
    fn default() -> Self {
        Self {
            base: None,
            current: None,
            incoming: None,
            confidence: 1.0,
        }
    }
}

impl Row {
    const fn position(&self) -> RowPosition {
        RowPosition {
            base: self.base,
            current: self.current,
            incoming: self.incoming,
        }
    }
}

/// One side's cells with everything the passes key on, computed once.
struct CellSeq<'a> {
    cells: &'a [Cell],
    fingerprints: Vec<Fingerprint>,
    normalized: Vec<Fingerprint>,
    stats: Vec<CellStats>,
}

impl<'a> CellSeq<'a> {
    fn new(cells: &'a [Cell]) -> Self {
        Self {
            cells,
            fingerprints: cells.iter().map(Fingerprint::of).collect(),
            normalized: cells.iter().map(Fingerprint::of_normalized).collect(),
            stats: cells.iter().map(CellStats::of).collect(),
        }
    }

    const fn len(&self) -> usize {
        self.cells.len()
    }
}

/// A matched pair: index `a` on the left side, `b` on the right.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Pair {
    a: usize,
    b: usize,
    score: f64,
}

/// Match two sequences among their free cells.
///
/// `anchors` are pairs established elsewhere that constrain order (used by
/// the current ↔ incoming match, whose anchors are rows shared through base).
fn match_pair(
    left: &CellSeq<'_>,
    left_free: &[bool],
    right: &CellSeq<'_>,
    right_free: &[bool],
    anchors: &[(usize, usize)],
) -> Vec<Pair> {
    let mut state = MatchState {
        left_free: left_free.to_vec(),
        right_free: right_free.to_vec(),
        pairs: Vec::new(),
    };

    state.keyed_pass(&left.fingerprints, &right.fingerprints, 1.0);
    let exact = state.pairs.len();
    state.keyed_pass(&left.normalized, &right.normalized, MAX_FUZZY_SCORE);
    let normalized = state.pairs.len() - exact;
    state.similarity_pass(left, right, anchors);
    let similar = state.pairs.len() - exact - normalized;
    state.positional_pass(left, right, anchors);
    let positional = state.pairs.len() - exact - normalized - similar;

    tracing::debug!(exact, normalized, similar, positional, "matched cell sequences");
    state.pairs
}

struct MatchState {
    left_free: Vec<bool>,
    right_free: Vec<bool>,
    pairs: Vec<Pair>,
}

impl MatchState {
    fn accept(&mut self, a: usize, b: usize, score: f64) {
        self.left_free[a] = false;
        self.right_free[b] = false;
        self.pairs.push(Pair { a, b, score });
    }

    fn free_left(&self) -> Vec<usize> {
        free_indices(&self.left_free)
    }

    fn free_right(&self) -> Vec<usize> {
        free_indices(&self.right_free)
    }

    /// Pair free cells with equal keys: order-preserving matches via LCS
    /// first, then leftover duplicates by lowest index.
    fn keyed_pass(&mut self, left: &[Fingerprint], right: &[Fingerprint], score: f64) {
        let fa = self.free_left();
        let fb = self.free_right();
        let (n, m) = (fa.len(), fb.len());

        // Suffix LCS table over the keys of the free cells.
        let mut table = vec![vec![0usize; m + 1]; n + 1];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                table[i][j] = if left[fa[i]] == right[fb[j]] {
                    table[i + 1][j + 1] + 1
                } else {
                    table[i + 1][j].max(table[i][j + 1])
                };
            }
        }

        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if left[fa[i]] == right[fb[j]] {
                self.accept(fa[i], fb[j], score);
                i += 1;
                j += 1;
            } else if table[i + 1][j] >= table[i][j + 1] {
                i += 1;
            } else {
                j += 1;
            }
        }

        // Duplicates left over are out-of-order copies: moved cells.
        for a in fa {
            if !self.left_free[a] {
                continue;
            }
            let found = fb
                .iter()
                .copied()
                .find(|&b| self.right_free[b] && left[a] == right[b]);
            if let Some(b) = found {
                self.accept(a, b, score);
            }
        }
    }

    fn similarity_pass(
        &mut self,
        left: &CellSeq<'_>,
        right: &CellSeq<'_>,
        anchors: &[(usize, usize)],
    ) {
        let fb = self.free_right();
        let mut candidates = Vec::new();
        let mut skipped = 0usize;
        for a in self.free_left() {
            for &b in &fb {
                if similarity_bound(&left.stats[a], &right.stats[b]) < MIN_SIMILARITY {
                    skipped += 1;
                    continue;
                }
                let score = cell_similarity(&left.cells[a], &right.cells[b]);
                if score >= MIN_SIMILARITY {
                    candidates.push(Pair { a, b, score });
                }
            }
        }
        tracing::trace!(candidates = candidates.len(), skipped, "scored similarity pairs");
        candidates.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then(x.a.cmp(&y.a))
                .then(x.b.cmp(&y.b))
        });

        for order_preserving in [true, false] {
            for c in &candidates {
                if !self.left_free[c.a] || !self.right_free[c.b] {
                    continue;
                }
                if order_preserving && self.crosses(c.a, c.b, anchors) {
                    continue;
                }
                self.accept(c.a, c.b, c.score);
            }
        }
    }

    fn positional_pass(
        &mut self,
        left: &CellSeq<'_>,
        right: &CellSeq<'_>,
        anchors: &[(usize, usize)],
    ) {
        let mut chain: Vec<(usize, usize)> = self
            .pairs
            .iter()
            .map(|p| (p.a, p.b))
            .chain(anchors.iter().copied())
            .collect();
        chain.sort_unstable();

        // Keep only an order-preserving backbone; gaps are defined by it.
        let mut backbone: Vec<(usize, usize)> = Vec::with_capacity(chain.len());
        for (a, b) in chain {
            if backbone.last().is_none_or(|&(_, last_b)| b > last_b) {
                backbone.push((a, b));
            }
        }
        backbone.push((left.len(), right.len()));

        let (mut lo_a, mut lo_b) = (0, 0);
        for (hi_a, hi_b) in backbone {
            if hi_a < lo_a || hi_b < lo_b {
                continue;
            }
            let gap_right: Vec<usize> = (lo_b..hi_b).filter(|&b| self.right_free[b]).collect();
            let mut next = 0;
            for a in lo_a..hi_a {
                if !self.left_free[a] {
                    continue;
                }
                let cell_type = left.cells[a].cell_type;
                let found = gap_right[next..]
                    .iter()
                    .position(|&b| right.cells[b].cell_type == cell_type);
                if let Some(k) = found {
                    let b = gap_right[next + k];
                    let score = cell_similarity(&left.cells[a], &right.cells[b]);
                    self.accept(a, b, score);
                    next += k + 1;
                }
            }
            lo_a = hi_a + 1;
            lo_b = hi_b + 1;
        }
    }

    /// Does pairing `(a, b)` invert the order of an accepted pair or anchor?
    fn crosses(&self, a: usize, b: usize, anchors: &[(usize, usize)]) -> bool {
        self.pairs
            .iter()
            .map(|p| (p.a, p.b))
            .chain(anchors.iter().copied())
            .any(|(x, y)| (x < a && y > b) || (x > a && y < b))
    }
}

fn free_indices(free: &[bool]) -> Vec<usize> {
    free.iter()
        .enumerate()
        .filter_map(|(i, f)| f.then_some(i))
        .collect()
}
