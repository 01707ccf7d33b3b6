//! Bounded global heap retaining the `k` best candidates seen so far.
//!
//! Distances are lower-is-better. The heap is kept bounded to `k` entries on
//! every insert, so its root is always the *worst* retained candidate (the
//! k-th-best overall) and is available in O(1) as the termination
//! threshold, without a separate pruning pass at extraction time.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use akidb_index::Candidate;

/// Wraps a [`Candidate`] with ordering reversed so that `BinaryHeap`, which
/// is a max-heap by default, keeps the *largest* (worst) distance at its
/// root — exactly the k-th-best entry once the heap holds `k` items.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry(Candidate);

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.distance.total_cmp(&other.0.distance)
    }
}

/// Bounded max-heap of size `k`, used to track the global top-k candidates.
pub struct GlobalHeap {
    k: usize,
    heap: BinaryHeap<HeapEntry>,
}

impl GlobalHeap {
    /// Creates an empty heap bounded to `k` entries.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k),
        }
    }

    /// Inserts a candidate, evicting the current worst entry if the heap is
    /// already at capacity and the new candidate is an improvement.
    pub fn insert(&mut self, candidate: Candidate) {
        if self.heap.len() < self.k {
            self.heap.push(HeapEntry(candidate));
            return;
        }
        if let Some(worst) = self.heap.peek() {
            if candidate.distance < worst.0.distance {
                self.heap.pop();
                self.heap.push(HeapEntry(candidate));
            }
        }
    }

    /// Returns the number of candidates currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the heap holds no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the distance of the k-th-best candidate currently retained,
    /// or `None` if fewer than `k` candidates have been seen.
    #[must_use]
    pub fn threshold(&self) -> Option<f32> {
        if self.heap.len() < self.k {
            return None;
        }
        self.heap.peek().map(|e| e.0.distance)
    }

    /// Drains the heap, returning candidates sorted best-first (ascending
    /// distance).
    pub fn drain_sorted(&mut self) -> Vec<Candidate> {
        let mut items: Vec<Candidate> = self.heap.drain().map(|e| e.0).collect();
        items.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_undefined_below_k() {
        let mut heap = GlobalHeap::new(3);
        heap.insert(Candidate {
            id: 1,
            distance: 0.1,
        });
        assert_eq!(heap.threshold(), None);
    }

    #[test]
    fn threshold_is_kth_best_once_full() {
        let mut heap = GlobalHeap::new(2);
        heap.insert(Candidate {
            id: 1,
            distance: 0.5,
        });
        heap.insert(Candidate {
            id: 2,
            distance: 0.1,
        });
        assert_eq!(heap.threshold(), Some(0.5));

        heap.insert(Candidate {
            id: 3,
            distance: 0.2,
        });
        // 0.5 should have been evicted in favor of 0.2; k-th-best is now 0.2
        assert_eq!(heap.threshold(), Some(0.2));
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn insert_ignores_worse_than_current_threshold() {
        let mut heap = GlobalHeap::new(2);
        heap.insert(Candidate {
            id: 1,
            distance: 0.1,
        });
        heap.insert(Candidate {
            id: 2,
            distance: 0.2,
        });
        heap.insert(Candidate {
            id: 3,
            distance: 0.9,
        });

        let drained = heap.drain_sorted();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, 1);
        assert_eq!(drained[1].id, 2);
    }

    #[test]
    fn drain_sorted_is_ascending_by_distance() {
        let mut heap = GlobalHeap::new(5);
        for (id, distance) in [(1, 0.4), (2, 0.1), (3, 0.3), (4, 0.2)] {
            heap.insert(Candidate { id, distance });
        }
        let drained = heap.drain_sorted();
        let distances: Vec<f32> = drained.iter().map(|c| c.distance).collect();
        assert_eq!(distances, vec![0.1, 0.2, 0.3, 0.4]);
        assert!(heap.is_empty());
    }
}
