// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! A bounded-capacity ordered list of internal indices: one vertex's
//! adjacency list. Order encodes proximity preference (earlier neighbors
//! are "better"), so replacement always takes an already-ordered sequence
//! rather than re-sorting here.

#[derive(Debug, Clone, Default)]
pub struct AdjacencyList {
    capacity: usize,
    neighbors: Vec<u32>,
}

impl AdjacencyList {
    pub fn with_capacity(capacity: usize) -> Self {
        AdjacencyList {
            capacity: capacity.max(1),
            neighbors: Vec::new(),
        }
    }

    /// Builds a list from `ids`, truncating to `capacity` if the caller
    /// handed over more than fits (callers are expected to have already
    /// pruned down to `prune_to <= capacity`, so this is a safety net, not
    /// the normal path).
    pub fn from_ids(capacity: usize, ids: impl IntoIterator<Item = u32>) -> Self {
        let capacity = capacity.max(1);
        let mut neighbors: Vec<u32> = ids.into_iter().collect();
        neighbors.truncate(capacity);
        AdjacencyList { capacity, neighbors }
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.neighbors
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.neighbors.len() >= self.capacity
    }

    pub fn contains(&self, id: u32) -> bool {
        self.neighbors.contains(&id)
    }

    /// Appends `id` if there is room and it is not already present. Returns
    /// whether it was added — this is the only mutation short of a full
    /// `replace`, used by back-edge insertion before a neighbor list grows
    /// past `max_degree` and needs re-pruning.
    pub fn push_unique(&mut self, id: u32) -> bool {
        if self.is_full() || self.contains(id) {
            return false;
        }
        self.neighbors.push(id);
        true
    }
}
