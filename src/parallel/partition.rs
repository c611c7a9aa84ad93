//! Work partitioner: contiguous, near-equal batch ranges per worker.

use crate::error::FdError;
use std::ops::Range;

/// Range of batch indices handled by worker `id` of `workers`.
///
/// The first `n % workers` workers get one extra element. Workers beyond `n` get
/// an empty range positioned at `n`.
pub fn worker_range(n: usize, workers: usize, id: usize) -> Range<usize> {
    debug_assert!(workers > 0 && id < workers);
    let base = n / workers;
    let rem = n % workers;
    let start = id * base + id.min(rem);
    let len = base + usize::from(id < rem);
    start..start + len
}

/// Split `[0, n)` into `workers` contiguous ranges.
pub fn partition(n: usize, workers: usize) -> Result<Vec<Range<usize>>, FdError> {
    if workers == 0 {
        return Err(FdError::InvalidOptions("cannot partition over zero workers".into()));
    }
    Ok((0..workers).map(|id| worker_range(n, workers, id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_lowest_workers() {
        let r = partition(7, 3).unwrap();
        assert_eq!(r, vec![0..3, 3..5, 5..7]);
    }

    #[test]
    fn more_workers_than_items() {
        let r = partition(2, 5).unwrap();
        assert_eq!(r, vec![0..1, 1..2, 2..2, 2..2, 2..2]);
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(partition(4, 0).is_err());
    }
}
