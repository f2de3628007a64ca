// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! One IVF posting list: a centroid plus the block-allocated storage of
//! every member vector currently assigned to it, addressed by in-cluster
//! position. There is no `internal_id -> (cluster, position)` reverse-lookup
//! table; a member's location is found by scanning [`Cluster::iter_members`]
//! across the owning index's cluster list (see `ivf::index`'s module doc for
//! why this deviates from the two-array reverse index).

use serde::{Deserialize, Serialize};
use vector::Metric;

use crate::store::blocked::BlockedStore;

#[derive(Serialize, Deserialize)]
pub struct Cluster {
    pub centroid: Vec<f32>,
    /// Cached `||centroid||^2`, used to speed up L2 query-centroid distance
    /// computation the way `dynamic_ivf.h` caches centroid norms.
    centroid_norm_sq: f32,
    /// The internal id occupying each position; `members[pos]` is the
    /// global internal id stored at `vectors` position `pos`.
    members: Vec<u32>,
    vectors: BlockedStore<f32>,
}

impl Cluster {
    pub fn new(centroid: Vec<f32>) -> Self {
        let dim = centroid.len();
        let centroid_norm_sq = centroid.iter().map(|&x| x * x).sum();
        Cluster {
            centroid,
            centroid_norm_sq,
            members: Vec::new(),
            vectors: BlockedStore::new(dim),
        }
    }

    pub fn centroid_norm_sq(&self) -> f32 {
        self.centroid_norm_sq
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_at(&self, position: usize) -> u32 {
        self.members[position]
    }

    pub fn vector_at(&self, position: usize) -> &[f32] {
        self.vectors.get(position)
    }

    /// Appends a member, returning its position within this cluster.
    pub fn push(&mut self, internal_id: u32, vector: &[f32]) -> usize {
        let position = self.members.len();
        self.members.push(internal_id);
        self.vectors.push(vector);
        position
    }

    pub fn distance_to_centroid(&self, metric: Metric, position: usize) -> f32 {
        metric.distance_f32(&self.centroid, self.vector_at(position))
    }

    pub fn iter_members(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.members.iter().copied().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_lookup_round_trips() {
        let mut cluster = Cluster::new(vec![0.0, 0.0]);
        let pos = cluster.push(5, &[1.0, 2.0]);
        assert_eq!(cluster.member_at(pos), 5);
        assert_eq!(cluster.vector_at(pos), &[1.0, 2.0]);
    }

}
