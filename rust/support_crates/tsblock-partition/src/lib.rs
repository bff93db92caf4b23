//! Coalescing of nearby byte ranges into fewer, larger reads.
//!
//! A [`Partitioner`] receives `n` items sorted by start offset, each described by a
//! `(start, end)` byte range, and groups them into [`Part`]s: single reads that
//! cover a contiguous run of items, trading some over-read bytes for fewer round trips.

use std::ops::Range;

/// A coalesced byte range covering a run of consecutive items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Start of the byte range (inclusive).
    pub start: u64,
    /// End of the byte range (exclusive).
    pub end: u64,
    /// Half-open range of item indices covered by this part.
    pub elem_range: Range<usize>,
}

impl Part {
    pub fn byte_range(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Groups sorted byte ranges into coalesced parts.
///
/// Contract: every item index in `0..len` belongs to exactly one returned part,
/// parts are returned in ascending order and do not overlap, and each part's byte
/// range covers the ranges of all its items.
pub trait Partitioner: Send + Sync + 'static {
    /// `range_of(i)` returns the `(start, end)` byte range of item `i`. Items must
    /// be sorted by `start`.
    fn partition(&self, len: usize, range_of: &dyn Fn(usize) -> (u64, u64)) -> Vec<Part>;
}

/// Merges consecutive items while the gap between the current part's end and the
/// next item's start does not exceed `max_gap_size` bytes.
#[derive(Debug, Clone, Copy)]
pub struct GapPartitioner {
    max_gap_size: u64,
}

impl GapPartitioner {
    pub fn new(max_gap_size: u64) -> GapPartitioner {
        GapPartitioner { max_gap_size }
    }

    pub fn max_gap_size(&self) -> u64 {
        self.max_gap_size
    }
}

impl Partitioner for GapPartitioner {
    fn partition(&self, len: usize, range_of: &dyn Fn(usize) -> (u64, u64)) -> Vec<Part> {
        let mut parts = Vec::new();
        let mut next = 0;
        while next < len {
            let first = next;
            let (start, mut end) = range_of(first);
            next += 1;
            // Keep growing the range until the end or until a large gap.
            while next < len {
                let (s, e) = range_of(next);
                if end.saturating_add(self.max_gap_size) < s {
                    break;
                }
                end = end.max(e);
                next += 1;
            }
            parts.push(Part {
                start,
                end,
                elem_range: first..next,
            });
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::{GapPartitioner, Part, Partitioner};

    fn partition(max_gap: u64, ranges: &[(u64, u64)]) -> Vec<Part> {
        GapPartitioner::new(max_gap).partition(ranges.len(), &|i| ranges[i])
    }

    #[test]
    fn test_empty_input() {
        assert!(partition(10, &[]).is_empty());
    }

    #[test]
    fn test_adjacent_and_overlapping_merge() {
        let parts = partition(0, &[(0, 64), (40, 104), (104, 168)]);
        assert_eq!(
            parts,
            [Part {
                start: 0,
                end: 168,
                elem_range: 0..3
            }]
        );
    }

    #[test]
    fn test_gap_tolerance() {
        let ranges = [(0, 10), (15, 25), (100, 110), (111, 120)];
        let parts = partition(5, &ranges);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].byte_range(), 0..25);
        assert_eq!(parts[0].elem_range, 0..2);
        assert_eq!(parts[1].byte_range(), 100..120);
        assert_eq!(parts[1].elem_range, 2..4);

        let parts = partition(4, &ranges);
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn test_unbounded_gap_merges_everything() {
        let ranges = [(0, 10), (1 << 40, (1 << 40) + 10), (u64::MAX - 10, u64::MAX)];
        let parts = partition(u64::MAX, &ranges);
        assert_eq!(
            parts,
            [Part {
                start: 0,
                end: u64::MAX,
                elem_range: 0..3
            }]
        );
    }

    #[test]
    fn test_contained_range_does_not_shrink_part() {
        let parts = partition(0, &[(0, 100), (10, 20)]);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].end, 100);
    }

    #[test]
    fn test_random_layouts_cover_every_item_once() {
        fastrand::seed(7265);
        for _ in 0..100 {
            let count = fastrand::usize(1..50);
            let mut starts = (0..count)
                .map(|_| fastrand::u64(0..10_000))
                .collect::<Vec<_>>();
            starts.sort_unstable();
            let ranges = starts
                .iter()
                .map(|&s| (s, s + fastrand::u64(1..200)))
                .collect::<Vec<_>>();
            let max_gap = fastrand::u64(0..500);
            let parts = partition(max_gap, &ranges);

            let mut expected_next = 0;
            for (i, part) in parts.iter().enumerate() {
                assert_eq!(part.elem_range.start, expected_next);
                expected_next = part.elem_range.end;
                for item in part.elem_range.clone() {
                    assert!(ranges[item].0 >= part.start);
                    assert!(ranges[item].1 <= part.end);
                }
                if i > 0 {
                    assert!(parts[i - 1].end + max_gap < part.start);
                }
            }
            assert_eq!(expected_next, count);
        }
    }
}
