//! # Bounded Neighbor Cache
//!
//! Keeps the `capacity` closest candidates seen so far, keyed by squared
//! distance. The cache owns the query's pruning bound: it starts at the
//! search range and, once the cache is full, shrinks to the distance of the
//! worst retained candidate. Spatial queries read [`NeighborCache::range_sq`]
//! after every insertion, so the bound tightens monotonically as the search
//! proceeds.

use ordered_float::OrderedFloat;
use priority_queue::PriorityQueue;

#[derive(Debug, Clone)]
pub struct NeighborCache {
    // Max-heap on distance: the top is the first candidate to evict.
    queue: PriorityQueue<usize, OrderedFloat<f64>>,
    capacity: usize,
    range_sq: f64,
}

impl NeighborCache {
    /// Cache holding at most `capacity` candidates strictly within `range_sq`.
    pub fn new(capacity: usize, range_sq: f64) -> Self {
        NeighborCache {
            queue: PriorityQueue::with_capacity(capacity.min(64)),
            capacity,
            range_sq,
        }
    }

    /// Cache limited by range only.
    pub fn unbounded(range_sq: f64) -> Self {
        NeighborCache {
            queue: PriorityQueue::new(),
            capacity: usize::MAX,
            range_sq,
        }
    }

    /// Current pruning bound. Never grows.
    pub fn range_sq(&self) -> f64 {
        self.range_sq
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn contains(&self, id: usize) -> bool {
        self.queue.get_priority(&id).is_some()
    }

    /// Offers a candidate. Returns true if it was kept.
    ///
    /// Candidates at or beyond the current bound are rejected. When the cache
    /// is full the farthest member is evicted to make room. Re-offering an id
    /// that is already cached is a no-op.
    pub fn insert(&mut self, id: usize, dist_sq: f64) -> bool {
        let in_range = dist_sq < self.range_sq;
        if !in_range || self.contains(id) {
            return false;
        }

        if self.is_full() {
            match self.worst() {
                Some(worst) if dist_sq < worst => {
                    self.queue.pop();
                }
                _ => return false,
            }
        }

        self.queue.push(id, OrderedFloat(dist_sq));

        if self.is_full() {
            if let Some(worst) = self.worst() {
                self.range_sq = worst;
            }
        }
        true
    }

    fn worst(&self) -> Option<f64> {
        self.queue.peek().map(|(_, dist)| dist.into_inner())
    }

    /// Cached `(id, dist_sq)` pairs, nearest first.
    pub fn sorted(&self) -> Vec<(usize, f64)> {
        let mut entries: Vec<(usize, f64)> = self
            .queue
            .iter()
            .map(|(&id, dist)| (id, dist.into_inner()))
            .collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        entries
    }

    /// Cached ids, nearest first.
    pub fn ids(&self) -> Vec<usize> {
        self.sorted().into_iter().map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_within_range() {
        let mut cache = NeighborCache::new(5, 25.0);
        assert!(cache.insert(1, 4.0));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ids(), vec![1]);
    }

    #[test]
    fn test_reject_outside_range() {
        let mut cache = NeighborCache::new(5, 25.0);
        assert!(!cache.insert(1, 36.0), "Distance 6 is outside range 5");
        assert!(!cache.insert(2, 25.0), "Range is exclusive");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_range_shrinks_when_full() {
        let mut cache = NeighborCache::new(2, 100.0);
        cache.insert(1, 9.0);
        assert_eq!(cache.range_sq(), 100.0, "Bound holds until the cache fills");
        cache.insert(2, 16.0);
        assert_eq!(cache.range_sq(), 16.0);

        // closer candidate evicts the farthest and tightens the bound
        assert!(cache.insert(3, 4.0));
        assert_eq!(cache.ids(), vec![3, 1]);
        assert_eq!(cache.range_sq(), 9.0);

        // farther than the worst retained: rejected
        assert!(!cache.insert(4, 12.0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut cache = NeighborCache::new(0, 100.0);
        assert!(!cache.insert(1, 1.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_ignored() {
        let mut cache = NeighborCache::unbounded(100.0);
        assert!(cache.insert(7, 4.0));
        assert!(!cache.insert(7, 4.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sorted_nearest_first() {
        let mut cache = NeighborCache::unbounded(100.0);
        cache.insert(1, 50.0);
        cache.insert(2, 1.0);
        cache.insert(3, 20.0);
        assert_eq!(cache.sorted(), vec![(2, 1.0), (3, 20.0), (1, 50.0)]);
        assert_eq!(cache.range_sq(), 100.0, "Unbounded cache never shrinks its range");
    }
}
