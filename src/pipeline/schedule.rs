//! Chunk sizes of one worker's batch.

/// Chunks start at `increment` grids and grow by `increment` up to `max`; the last
/// chunk holds whatever remains. Yields `(first grid, grid count)`.
#[derive(Debug, Clone)]
pub struct ChunkSchedule {
    total: usize,
    next: usize,
    size: usize,
    increment: usize,
    max: usize,
}

impl ChunkSchedule {
    pub fn new(total: usize, increment: usize, max: usize) -> Self {
        let max = max.max(1);
        let increment = increment.clamp(1, max);
        Self { total, next: 0, size: increment, increment, max }
    }
}

impl Iterator for ChunkSchedule {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let len = self.size.min(self.total - self.next);
        let start = self.next;
        self.next += len;
        self.size = (self.size + self.increment).min(self.max);
        Some((start, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_grow_then_truncate() {
        let chunks: Vec<_> = ChunkSchedule::new(20, 2, 6).collect();
        assert_eq!(chunks, vec![(0, 2), (2, 4), (6, 6), (12, 6), (18, 2)]);
    }

    #[test]
    fn one_grid_per_chunk_by_default() {
        assert_eq!(ChunkSchedule::new(3, 1, 1).count(), 3);
        assert_eq!(ChunkSchedule::new(0, 1, 1).count(), 0);
    }
}
