use crate::types::{BlockHeight, Chunk};

/// Splits `[start, end]` into contiguous, non-overlapping chunks of at most `max_chunk_size`
/// blocks, oldest first.
#[derive(Debug, Clone)]
pub struct ChunkIterator {
    current: BlockHeight,
    end: BlockHeight,
    max_chunk_size: u64,
    batch_count: u64,
    total_batches: u64,
}

impl ChunkIterator {
    /// An empty iterator when `start > end`.
    ///
    /// # Panics
    ///
    /// Panics if `max_chunk_size` is 0.
    #[must_use]
    pub const fn new(start: BlockHeight, end: BlockHeight, max_chunk_size: u64) -> Self {
        assert!(max_chunk_size >= 1, "max_chunk_size must be at least 1");
        let total_batches = if start > end { 0 } else { (end - start) / max_chunk_size + 1 };
        Self { current: start, end, max_chunk_size, batch_count: 0, total_batches }
    }

    /// Number of chunks yielded so far.
    #[must_use]
    pub fn batch_count(&self) -> u64 {
        self.batch_count
    }
}

impl Iterator for ChunkIterator {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.batch_count >= self.total_batches {
            return None;
        }
        self.batch_count += 1;

        let from = self.current;
        let to = from.saturating_add(self.max_chunk_size - 1).min(self.end);
        self.current = to.saturating_add(1);

        Some(Chunk { from, to })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.total_batches - self.batch_count) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// The chunk starting at `next_block`, bounded by `max_chunk_size` and `latest`.
pub(crate) fn next_chunk(
    next_block: BlockHeight,
    latest: BlockHeight,
    max_chunk_size: u64,
) -> Option<Chunk> {
    ChunkIterator::new(next_block, latest, max_chunk_size).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(iter: ChunkIterator) -> Vec<(u64, u64)> {
        iter.map(|c| (c.from, c.to)).collect()
    }

    #[test]
    fn splits_range_into_bounded_chunks() {
        assert_eq!(
            spans(ChunkIterator::new(100, 117, 5)),
            vec![(100, 104), (105, 109), (110, 114), (115, 117)]
        );
    }

    #[test]
    fn single_chunk_when_range_fits() {
        assert_eq!(spans(ChunkIterator::new(100, 120, 50)), vec![(100, 120)]);
    }

    #[test]
    fn exact_boundary() {
        assert_eq!(spans(ChunkIterator::new(100, 199, 50)), vec![(100, 149), (150, 199)]);
    }

    #[test]
    fn empty_when_start_is_past_end() {
        assert_eq!(ChunkIterator::new(200, 100, 50).next(), None);
    }

    #[test]
    fn single_block() {
        assert_eq!(spans(ChunkIterator::new(100, 100, 50)), vec![(100, 100)]);
    }

    #[test]
    fn one_block_chunks() {
        assert_eq!(
            spans(ChunkIterator::new(100, 103, 1)),
            vec![(100, 100), (101, 101), (102, 102), (103, 103)]
        );
    }

    #[test]
    fn starting_from_genesis() {
        assert_eq!(spans(ChunkIterator::new(0, 100, 50)), vec![(0, 49), (50, 99), (100, 100)]);
    }

    #[test]
    fn does_not_overflow_at_the_top_of_the_range() {
        let chunks = spans(ChunkIterator::new(u64::MAX - 2, u64::MAX, 2));
        assert_eq!(chunks, vec![(u64::MAX - 2, u64::MAX - 1), (u64::MAX, u64::MAX)]);
    }

    #[test]
    fn chunks_are_contiguous_and_cover_the_range() {
        let chunks: Vec<_> = ChunkIterator::new(7, 1_000, 33).collect();

        assert_eq!(chunks.first().map(|c| c.from), Some(7));
        assert_eq!(chunks.last().map(|c| c.to), Some(1_000));
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].to + 1, pair[1].from);
        }
        assert!(chunks.iter().all(|c| c.len() <= 33));
    }

    #[test]
    fn size_hint_tracks_remaining_chunks() {
        let mut iter = ChunkIterator::new(100, 300, 50);
        assert_eq!(iter.size_hint(), (5, Some(5)));
        iter.next();
        assert_eq!(iter.batch_count(), 1);
        assert_eq!(iter.size_hint(), (4, Some(4)));
    }

    #[test]
    #[should_panic(expected = "max_chunk_size must be at least 1")]
    fn zero_chunk_size_panics() {
        let _ = ChunkIterator::new(100, 200, 0);
    }

    #[test]
    fn next_chunk_is_bounded_by_latest() {
        assert_eq!(next_chunk(10, 12, 100), Some(Chunk { from: 10, to: 12 }));
        assert_eq!(next_chunk(10, 200, 100), Some(Chunk { from: 10, to: 109 }));
        assert_eq!(next_chunk(13, 12, 100), None);
    }
}
