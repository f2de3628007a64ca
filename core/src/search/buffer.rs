// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! A bounded best-k candidate buffer, kept sorted best-to-worst, with a
//! separate "expanded" flag per entry so greedy search can ask for "the
//! closest not-yet-expanded candidate" without a second data structure.
//!
//! This generalizes the teacher's `NeighborPriorityQueue`: the teacher's
//! queue is always smaller-distance-is-better because every caller negates
//! inner-product scores before inserting. Here the comparator polarity is a
//! constructor argument instead, so the same buffer serves both metrics
//! without every call site having to remember to flip a sign.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: u32,
    pub distance: f32,
}

/// `true` if `a` is strictly closer than `b` under `less_is_closer`'s
/// polarity, with ties broken by ascending id — `spec.md` §4.6's
/// determinism rule ("break by ascending internal index").
pub fn is_better(less_is_closer: bool, a: &Candidate, b: &Candidate) -> bool {
    match a.distance.partial_cmp(&b.distance) {
        Some(Ordering::Less) => less_is_closer,
        Some(Ordering::Greater) => !less_is_closer,
        Some(Ordering::Equal) | None => a.id < b.id,
    }
}

pub struct SearchBuffer {
    less_is_closer: bool,
    capacity: usize,
    items: Vec<Candidate>,
    expanded: Vec<bool>,
}

impl SearchBuffer {
    pub fn new(capacity: usize, less_is_closer: bool) -> Self {
        SearchBuffer {
            less_is_closer,
            capacity: capacity.max(1),
            items: Vec::new(),
            expanded: Vec::new(),
        }
    }

    /// Used when a caller's search-list-size override exceeds the capacity
    /// the buffer was created with (`spec.md` §4.6 / teacher's
    /// `resize_for_new_candidate_size`).
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        if self.items.len() > self.capacity {
            self.items.truncate(self.capacity);
            self.expanded.truncate(self.capacity);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn is_better(&self, a: &Candidate, b: &Candidate) -> bool {
        is_better(self.less_is_closer, a, b)
    }

    /// Inserts `candidate`, keeping the buffer sorted best-to-worst. If the
    /// buffer is already at capacity and `candidate` is no better than the
    /// current worst entry, it is dropped and this returns `false`.
    pub fn insert(&mut self, candidate: Candidate) -> bool {
        if self.items.len() >= self.capacity {
            if let Some(worst) = self.items.last() {
                if !self.is_better(&candidate, worst) {
                    return false;
                }
            }
        }
        let pos = self
            .items
            .partition_point(|existing| self.is_better(existing, &candidate));
        self.items.insert(pos, candidate);
        self.expanded.insert(pos, false);
        if self.items.len() > self.capacity {
            self.items.truncate(self.capacity);
            self.expanded.truncate(self.capacity);
        }
        true
    }

    pub fn has_unexpanded(&self) -> bool {
        self.expanded.iter().any(|&e| !e)
    }

    /// Returns the closest not-yet-expanded candidate and marks it
    /// expanded, or `None` if every entry has already been expanded.
    pub fn next_unexpanded(&mut self) -> Option<Candidate> {
        let idx = self.expanded.iter().position(|&e| !e)?;
        self.expanded[idx] = true;
        Some(self.items[idx])
    }

    /// Like [`next_unexpanded`](SearchBuffer::next_unexpanded) but does not
    /// mark the entry expanded. Used by range search's cancellation check,
    /// which needs to inspect the closest pending candidate without
    /// consuming it.
    pub fn peek_unexpanded(&self) -> Option<Candidate> {
        let idx = self.expanded.iter().position(|&e| !e)?;
        Some(self.items[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    /// The best `k` entries whose id satisfies `keep`, in best-to-worst
    /// order — the deletion-skip and caller-filter predicates are applied
    /// here, at result collection, not during traversal (`spec.md` §4.6:
    /// "deleted nodes remain in the traversal ... but are excluded from the
    /// final result").
    pub fn best_matching<F: Fn(u32) -> bool>(&self, k: usize, keep: F) -> Vec<Candidate> {
        self.items
            .iter()
            .filter(|c| keep(c.id))
            .take(k)
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_l2_ascending_order() {
        let mut buf = SearchBuffer::new(3, true);
        for (id, distance) in [(1, 5.0), (2, 1.0), (3, 3.0)] {
            buf.insert(Candidate { id, distance });
        }
        let ids: Vec<u32> = buf.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn insert_keeps_inner_product_descending_order() {
        let mut buf = SearchBuffer::new(3, false);
        for (id, distance) in [(1, 5.0), (2, 1.0), (3, 3.0)] {
            buf.insert(Candidate { id, distance });
        }
        let ids: Vec<u32> = buf.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn insert_drops_worse_than_capacity_floor() {
        let mut buf = SearchBuffer::new(2, true);
        buf.insert(Candidate { id: 1, distance: 1.0 });
        buf.insert(Candidate { id: 2, distance: 2.0 });
        assert!(!buf.insert(Candidate { id: 3, distance: 3.0 }));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn ties_break_on_ascending_id() {
        let mut buf = SearchBuffer::new(3, true);
        buf.insert(Candidate { id: 5, distance: 1.0 });
        buf.insert(Candidate { id: 1, distance: 1.0 });
        let ids: Vec<u32> = buf.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn next_unexpanded_returns_closest_first() {
        let mut buf = SearchBuffer::new(3, true);
        buf.insert(Candidate { id: 1, distance: 2.0 });
        buf.insert(Candidate { id: 2, distance: 1.0 });
        assert_eq!(buf.next_unexpanded().unwrap().id, 2);
        assert_eq!(buf.next_unexpanded().unwrap().id, 1);
        assert!(buf.next_unexpanded().is_none());
        assert!(!buf.has_unexpanded());
    }

    #[test]
    fn best_matching_filters_and_caps_at_k() {
        let mut buf = SearchBuffer::new(4, true);
        for (id, distance) in [(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)] {
            buf.insert(Candidate { id, distance });
        }
        let kept = buf.best_matching(2, |id| id != 1);
        assert_eq!(kept.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
    }
}
