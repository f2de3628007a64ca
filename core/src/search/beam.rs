// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Greedy beam search over the graph: repeatedly expand the closest
//! not-yet-expanded candidate in the [`SearchBuffer`], pushing its
//! unvisited neighbors in.
//!
//! Grounded in the teacher's `search_for_point`/`greedy_search`
//! (`algorithm/search/search.rs`): start from one or more entry points,
//! track globally-visited ids in a `hashbrown::HashSet` exactly as the
//! teacher's `node_visited_robinset` (kept separate from the buffer's own
//! per-candidate `expanded` flags, since a node can be *visited* — already
//! pushed into the buffer — before it is ever *expanded*), and stop either
//! when the buffer is exhausted or a caller-supplied cancellation check
//! fires (used by range search to stop once every remaining candidate in
//! the buffer is already known to be outside the radius).

use hashbrown::HashSet;

use crate::graph::InMemoryGraph;
use crate::search::buffer::{Candidate, SearchBuffer};
use crate::store::distance_adapter::AdaptedDistance;

pub struct BeamSearchResult {
    /// Every candidate pushed into the buffer over the course of the
    /// search, in the order first visited — used by insertion, which needs
    /// the full visited set (not just the top-k) as the initial candidate
    /// pool for pruning.
    pub visited: Vec<Candidate>,
    pub buffer: SearchBuffer,
}

/// Runs greedy beam search from `entry_points` toward the query fixed in
/// `distance`, expanding through `graph`.
///
/// Every unvisited neighbor is inserted into the buffer unconditionally —
/// `spec.md` §4.6: "Deleted nodes remain in the traversal ... but are
/// excluded from the final result", matching the teacher's
/// `search_for_point`, which queues every unvisited neighbor and filters
/// deleted ids only when reading results back out. This function has no
/// notion of "deleted" or "filtered" at all: a caller that needs either
/// applies its own predicate to [`BeamSearchResult::buffer`] afterward
/// (via [`SearchBuffer::best_matching`]'s `keep` predicate), so that a
/// soft-deleted or filtered-out node is still expanded from, only ever
/// excluded from what gets handed back as an answer.
///
/// `cancel` is checked once per expansion step and stops the search early
/// when it returns `true`.
pub fn greedy_search<C>(
    graph: &InMemoryGraph,
    distance: &dyn AdaptedDistance,
    entry_points: &[u32],
    buffer_capacity: usize,
    mut cancel: C,
) -> Result<BeamSearchResult, crate::common::error::AnnError>
where
    C: FnMut(&SearchBuffer) -> bool,
{
    let mut buffer = SearchBuffer::new(buffer_capacity, distance.less_is_closer());
    let mut visited_ids: HashSet<u32> = HashSet::new();
    let mut visited: Vec<Candidate> = Vec::new();

    for &entry in entry_points {
        if visited_ids.insert(entry) {
            let candidate = Candidate {
                id: entry,
                distance: distance.compute(entry as usize),
            };
            visited.push(candidate);
            buffer.insert(candidate);
        }
    }

    while buffer.has_unexpanded() {
        if cancel(&buffer) {
            break;
        }
        let current = buffer.next_unexpanded().expect("has_unexpanded just checked");
        let neighbors = graph.neighbors(current.id as usize)?;
        for neighbor_id in neighbors {
            if !visited_ids.insert(neighbor_id) {
                continue;
            }
            let candidate = Candidate {
                id: neighbor_id,
                distance: distance.compute(neighbor_id as usize),
            };
            visited.push(candidate);
            buffer.insert(candidate);
        }
    }

    Ok(BeamSearchResult { visited, buffer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::distance_adapter::AdaptedDistance;

    struct FixedDistance {
        query: Vec<f32>,
        points: Vec<Vec<f32>>,
    }

    impl AdaptedDistance for FixedDistance {
        fn compute(&self, internal_id: usize) -> f32 {
            let p = &self.points[internal_id];
            self.query
                .iter()
                .zip(p.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt()
        }

        fn less_is_closer(&self) -> bool {
            true
        }
    }

    fn line_graph(n: usize) -> InMemoryGraph {
        let graph = InMemoryGraph::new(n, 2);
        for i in 0..n {
            let mut neighbors = Vec::new();
            if i > 0 {
                neighbors.push((i - 1) as u32);
            }
            if i + 1 < n {
                neighbors.push((i + 1) as u32);
            }
            graph.replace(i, neighbors).unwrap();
        }
        graph
    }

    #[test]
    fn finds_closest_point_on_a_line() {
        let graph = line_graph(6);
        let points: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32]).collect();
        let distance = FixedDistance {
            query: vec![4.1],
            points,
        };
        let result = greedy_search(&graph, &distance, &[0], 4, |_| false).unwrap();
        let best = result.buffer.best_matching(1, |_| true);
        assert_eq!(best[0].id, 4);
    }

    /// `skip`-equivalent filtering is now entirely the caller's job, applied
    /// to `best_matching`'s `keep` predicate — this exercises that a
    /// filtered-out node (`2`) still gets expanded from, so traversal
    /// reaches the nodes beyond it (`3`, `4`) that only reachable through
    /// its out-edges in this line graph.
    #[test]
    fn filtered_out_node_is_still_traversed_through() {
        let graph = line_graph(5);
        let points: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32]).collect();
        let distance = FixedDistance {
            query: vec![2.0],
            points,
        };
        let result = greedy_search(&graph, &distance, &[0], 5, |_| false).unwrap();
        assert!(result.visited.iter().any(|c| c.id == 2));
        assert!(result.visited.iter().any(|c| c.id == 3));
        assert!(result.visited.iter().any(|c| c.id == 4));
        let best = result.buffer.best_matching(5, |id| id != 2);
        assert!(best.iter().all(|c| c.id != 2));
        assert!(best.iter().any(|c| c.id == 3));
        assert!(best.iter().any(|c| c.id == 4));
    }

    #[test]
    fn cancel_stops_expansion_early() {
        let graph = line_graph(10);
        let points: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32]).collect();
        let distance = FixedDistance {
            query: vec![0.0],
            points,
        };
        let mut expansions = 0;
        let result = greedy_search(&graph, &distance, &[0], 10, |_| {
            expansions += 1;
            expansions > 2
        })
        .unwrap();
        assert!(result.visited.len() < 10);
    }
}
