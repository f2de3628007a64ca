// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The adjacency graph: a growable array of bounded-degree adjacency lists,
//! one per internal index.
//!
//! The teacher locks per-vertex (`final_graph.read_vertex_and_neighbors` /
//! `write_vertex_and_neighbors`, its `VertexAndNeighbors` type) rather than
//! behind one graph-wide lock, so that unrelated vertices' insertions and
//! searches never serialize on each other. [`InMemoryGraph`] keeps that
//! shape: one `RwLock<AdjacencyList>` per node. `replace` always swaps in a
//! whole new list rather than mutating in place, which is what lets
//! concurrent batch insertion (`spec.md` §4.7) avoid taking a lock across a
//! read-modify-write: a worker reads the current list, computes the merged
//! and re-pruned replacement off to the side, then publishes it in one
//! `replace` call.

mod adjacency;

pub use adjacency::AdjacencyList;

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::common::error::AnnError;

pub struct InMemoryGraph {
    nodes: Vec<RwLock<AdjacencyList>>,
    max_degree: usize,
}

/// A plain, serializable snapshot of the graph's adjacency lists, used for
/// `save`/`load` since `RwLock` itself carries no `Serialize` impl.
#[derive(Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub max_degree: usize,
    pub adjacency: Vec<Vec<u32>>,
}

impl InMemoryGraph {
    pub fn new(n_nodes: usize, max_degree: usize) -> Self {
        let max_degree = max_degree.max(1);
        let nodes = (0..n_nodes)
            .map(|_| RwLock::new(AdjacencyList::with_capacity(max_degree)))
            .collect();
        InMemoryGraph { nodes, max_degree }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    fn node(&self, id: usize) -> Result<&RwLock<AdjacencyList>, AnnError> {
        self.nodes
            .get(id)
            .ok_or_else(|| AnnError::invalid_argument(format!("node {id} out of range")))
    }

    /// A snapshot copy of node `id`'s current neighbors.
    pub fn neighbors(&self, id: usize) -> Result<Vec<u32>, AnnError> {
        let guard = self
            .node(id)?
            .read()
            .map_err(|_| AnnError::lock_poisoned("graph adjacency list"))?;
        Ok(guard.as_slice().to_vec())
    }

    pub fn degree(&self, id: usize) -> Result<usize, AnnError> {
        let guard = self
            .node(id)?
            .read()
            .map_err(|_| AnnError::lock_poisoned("graph adjacency list"))?;
        Ok(guard.len())
    }

    /// Atomically replaces node `id`'s adjacency list, truncated to
    /// `max_degree` if the caller passed more ids than fit.
    pub fn replace(&self, id: usize, new_list: impl IntoIterator<Item = u32>) -> Result<(), AnnError> {
        let mut guard = self
            .node(id)?
            .write()
            .map_err(|_| AnnError::lock_poisoned("graph adjacency list"))?;
        *guard = AdjacencyList::from_ids(self.max_degree, new_list);
        Ok(())
    }

    /// Appends `id` to node `vertex`'s list if there is room and it is not
    /// already present, returning whether it was added. Used by back-edge
    /// insertion (`inter_insert`), which only re-prunes when this fails
    /// because the list is already full.
    pub fn push_unique(&self, vertex: usize, id: u32) -> Result<bool, AnnError> {
        let mut guard = self
            .node(vertex)?
            .write()
            .map_err(|_| AnnError::lock_poisoned("graph adjacency list"))?;
        Ok(guard.push_unique(id))
    }

    pub fn clear(&self, id: usize) -> Result<(), AnnError> {
        self.replace(id, std::iter::empty())
    }

    /// Grows the node array by `additional` empty adjacency lists. Must
    /// only be called when no reader holds a view spanning the new range —
    /// in practice, while a single-writer insertion batch is in progress
    /// and before any worker starts writing into the new nodes.
    pub fn extend(&mut self, additional: usize) {
        for _ in 0..additional {
            self.nodes
                .push(RwLock::new(AdjacencyList::with_capacity(self.max_degree)));
        }
    }

    /// Shrinks the node array to `new_len`. Only valid when no search is in
    /// flight (compaction's offline precondition, `spec.md` §4.9).
    pub fn truncate(&mut self, new_len: usize) {
        self.nodes.truncate(new_len);
    }

    pub fn snapshot(&self) -> Result<GraphSnapshot, AnnError> {
        let mut adjacency = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            adjacency.push(self.neighbors(i)?);
        }
        Ok(GraphSnapshot {
            max_degree: self.max_degree,
            adjacency,
        })
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let max_degree = snapshot.max_degree.max(1);
        let nodes = snapshot
            .adjacency
            .into_iter()
            .map(|ids| RwLock::new(AdjacencyList::from_ids(max_degree, ids)))
            .collect();
        InMemoryGraph { nodes, max_degree }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_then_neighbors_round_trips() {
        let graph = InMemoryGraph::new(4, 3);
        graph.replace(1, [2, 3]).unwrap();
        assert_eq!(graph.neighbors(1).unwrap(), vec![2, 3]);
    }

    #[test]
    fn replace_truncates_to_max_degree() {
        let graph = InMemoryGraph::new(1, 2);
        graph.replace(0, [1, 2, 3, 4]).unwrap();
        assert_eq!(graph.neighbors(0).unwrap(), vec![1, 2]);
    }

    #[test]
    fn extend_and_truncate_resize_the_node_array() {
        let mut graph = InMemoryGraph::new(2, 4);
        graph.extend(3);
        assert_eq!(graph.n_nodes(), 5);
        graph.truncate(2);
        assert_eq!(graph.n_nodes(), 2);
    }

    #[test]
    fn snapshot_round_trips_through_from_snapshot() {
        let graph = InMemoryGraph::new(3, 4);
        graph.replace(0, [1, 2]).unwrap();
        graph.replace(2, [0]).unwrap();
        let snapshot = graph.snapshot().unwrap();
        let restored = InMemoryGraph::from_snapshot(snapshot);
        assert_eq!(restored.neighbors(0).unwrap(), vec![1, 2]);
        assert_eq!(restored.neighbors(2).unwrap(), vec![0]);
    }

    #[test]
    fn push_unique_respects_capacity() {
        let graph = InMemoryGraph::new(1, 1);
        assert!(graph.push_unique(0, 5).unwrap());
        assert!(!graph.push_unique(0, 6).unwrap());
    }
}
