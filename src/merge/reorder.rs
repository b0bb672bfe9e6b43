//! Reordering detection over an alignment.
//!
//! Insertions and deletions never change the relative order of the cells two
//! sides share. So for every pair of sides, the rows populated on both are
//! sorted by their index on the first side; if the indices on the second
//! side are then not strictly increasing, some pair of shared cells swapped
//! places and the notebook was reordered.

use crate::model::CellMapping;

/// Returns `true` if any two sides disagree on the relative order of the
/// cells they share.
///
/// Only rows with at least two populated sides participate. This reports
/// *whether* a reordering happened, not which cells moved.
#[must_use]
pub fn has_reordering(mappings: &[CellMapping]) -> bool {
    let pairs: [(fn(&CellMapping) -> Option<usize>, fn(&CellMapping) -> Option<usize>); 3] = [
        (|m| m.base_index, |m| m.current_index),
        (|m| m.base_index, |m| m.incoming_index),
        (|m| m.current_index, |m| m.incoming_index),
    ];

    pairs.iter().any(|(left, right)| {
        let mut shared: Vec<(usize, usize)> = mappings
            .iter()
            .filter(|m| m.side_count() >= 2)
            .filter_map(|m| Some((left(m)?, right(m)?)))
            .collect();
        shared.sort_unstable();
        shared.windows(2).any(|w| w[1].1 <= w[0].1)
    })
}
