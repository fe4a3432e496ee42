//! Greedy nearest-neighbour sequencing.
//!
//! Deterministic and single-pass: always computed alongside the search so a
//! complete sequence exists even when the search reaches no terminal.

use crate::compatibility::CompatibilityMatrix;

/// Build a sequence of up to `length` items by always appending the remaining
/// item most compatible with the current last one.
///
/// Starts from `start`, or from the first pool item when none is given.
/// Ties go to the item earliest in the pool.
pub fn greedy_sequence(matrix: &CompatibilityMatrix, length: usize, start: Option<usize>) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..matrix.len()).collect();
    if length == 0 || pool.is_empty() {
        return Vec::new();
    }

    let first = start.filter(|&s| s < pool.len()).unwrap_or(0);
    pool.retain(|&item| item != first);
    let mut sequence = Vec::with_capacity(length.min(matrix.len()));
    sequence.push(first);

    while sequence.len() < length && !pool.is_empty() {
        let last = sequence[sequence.len() - 1];
        let mut best = 0;
        for (slot, &candidate) in pool.iter().enumerate().skip(1) {
            if matrix.score(last, candidate) > matrix.score(last, pool[best]) {
                best = slot;
            }
        }
        sequence.push(pool.remove(best));
    }

    log::trace!("Greedy sequence: {sequence:?}");
    sequence
}
