// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The dynamic Vamana index: a proximity graph searched with greedy beam
//! search, grown by incremental insertion with α-pruned rewiring, shrunk by
//! soft deletion followed by consolidation, and renumbered by offline
//! compaction.
//!
//! Grounded in the teacher's `InmemIndex` (`inmem_index.rs`): the insertion
//! pipeline here follows its `insert_vertex_id` → `search_for_point_and_prune`
//! → `update_vertex_with_neighbors` → `update_neighbors_of_vertex` call
//! chain, generalized from the teacher's single in-process `RwLock`-free
//! scratch-buffer reuse to this workspace's per-field `RwLock`s (`storage`,
//! `graph`, `translator`, `status`, `entry_point`) so that `add` only needs
//! `&self`, matching `spec.md` §5's "concurrent batch insertion" contract.

use std::io;
use std::sync::{Arc, RwLock};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use vector::Metric;

use crate::common::error::AnnError;
use crate::common::filter::{IdFilter, NoFilter};
use crate::common::range_sink::RangeSink;
use crate::common::status::SlotStatus;
use crate::concurrency::WorkerPool;
use crate::graph::{GraphSnapshot, InMemoryGraph};
use crate::logging;
use crate::search::beam::greedy_search;
use crate::search::buffer::Candidate;
use crate::store::backend::{ElementKind, Storage, StorageBackend};
use crate::translator::IdTranslator;
use crate::vamana::config::{effective_search_window_size, VamanaBuildParameters, VamanaSearchParameters};
use crate::vamana::pruner::alpha_prune;

const SCHEMA_NAME: &str = "annidx.vamana";
const SCHEMA_VERSION: u32 = 1;

pub struct DynamicVamanaIndex {
    metric: Metric,
    build_params: VamanaBuildParameters,
    storage: RwLock<Storage>,
    graph: RwLock<InMemoryGraph>,
    translator: RwLock<IdTranslator>,
    status: RwLock<Vec<SlotStatus>>,
    entry_point: RwLock<Option<u32>>,
    pool: Arc<WorkerPool>,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    schema: String,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    metric: Metric,
    build_params: VamanaBuildParameters,
    storage: Storage,
    graph: GraphSnapshot,
    translator: IdTranslator,
    status: Vec<SlotStatus>,
    entry_point: Option<u32>,
}

impl DynamicVamanaIndex {
    /// An empty index ready to receive `add` calls.
    pub fn new_empty(
        dim: usize,
        metric: Metric,
        element_kind: ElementKind,
        build_params: VamanaBuildParameters,
    ) -> Result<Self, AnnError> {
        if dim == 0 {
            return Err(AnnError::invalid_argument("dim must be nonzero"));
        }
        let pool = WorkerPool::shared(build_params.num_threads)?;
        Ok(DynamicVamanaIndex {
            metric,
            build_params,
            storage: RwLock::new(Storage::new(element_kind, dim)),
            graph: RwLock::new(InMemoryGraph::new(0, build_params.max_degree)),
            translator: RwLock::new(IdTranslator::new()),
            status: RwLock::new(Vec::new()),
            entry_point: RwLock::new(None),
            pool,
        })
    }

    /// Builds a fresh index over `vectors`/`external_ids` in one call:
    /// selects an approximate medoid as entry point (teacher's
    /// `calculate_medoid_point_id`/`calculate_centroid_point`), inserts it
    /// first, then inserts the rest through the worker pool's static
    /// partition — `spec.md` §4.7's "concurrent batch insertion".
    pub fn build(
        vectors: &[Vec<f32>],
        external_ids: &[u64],
        metric: Metric,
        element_kind: ElementKind,
        build_params: VamanaBuildParameters,
    ) -> Result<Self, AnnError> {
        if vectors.is_empty() {
            return Err(AnnError::invalid_argument("build requires at least one vector"));
        }
        if vectors.len() != external_ids.len() {
            return Err(AnnError::invalid_argument(
                "vectors and external_ids must have the same length",
            ));
        }
        let dim = vectors[0].len();
        for v in vectors {
            if v.len() != dim {
                return Err(AnnError::invalid_argument("all vectors must share one dimension"));
            }
        }
        let index = Self::new_empty(dim, metric, element_kind, build_params)?;
        let medoid = nearest_to_centroid(vectors, metric);
        index.add(external_ids[medoid], &vectors[medoid])?;

        let remaining: Vec<usize> = (0..vectors.len()).filter(|&i| i != medoid).collect();
        index.pool.static_for_each(remaining.len(), |j| {
            let i = remaining[j];
            index.add(external_ids[i], &vectors[i])
        })?;
        logging::log_line(
            logging::Level::Info,
            format_args!("vamana build complete: {} vectors, entry point external id {}", vectors.len(), external_ids[medoid]),
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.translator
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_id(&self, external_id: u64) -> bool {
        self.translator
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_external(external_id)
    }

    /// Inserts one new vector, running the full
    /// search-for-point-and-prune → back-edge-rewire pipeline.
    pub fn add(&self, external_id: u64, vector: &[f32]) -> Result<(), AnnError> {
        {
            let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
            if vector.len() != storage.dim() {
                return Err(AnnError::invalid_argument(format!(
                    "expected dimension {}, got {}",
                    storage.dim(),
                    vector.len()
                )));
            }
        }

        let internal_id = {
            let mut translator = self
                .translator
                .write()
                .map_err(|_| AnnError::lock_poisoned("translator"))?;
            translator.insert(external_id)?
        };

        {
            let mut storage = self
                .storage
                .write()
                .map_err(|_| AnnError::lock_poisoned("storage"))?;
            storage.append(vector)?;
        }
        {
            let mut graph = self.graph.write().map_err(|_| AnnError::lock_poisoned("graph"))?;
            if graph.n_nodes() <= internal_id as usize {
                graph.extend(internal_id as usize + 1 - graph.n_nodes());
            }
        }
        {
            let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;
            if status.len() <= internal_id as usize {
                status.resize(internal_id as usize + 1, SlotStatus::Empty);
            }
            status[internal_id as usize] = SlotStatus::Valid;
        }

        let entry = self.ensure_entry_point(internal_id)?;
        if entry == internal_id {
            // First vertex in the index: nothing to search against yet.
            return Ok(());
        }

        let pruned = self.search_for_point_and_prune(internal_id, vector, entry)?;
        {
            let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
            graph.replace(internal_id as usize, pruned.iter().copied())?;
        }
        for &neighbor in &pruned {
            self.inter_insert(neighbor, internal_id)?;
        }
        Ok(())
    }

    fn ensure_entry_point(&self, candidate: u32) -> Result<u32, AnnError> {
        let mut entry_point = self
            .entry_point
            .write()
            .map_err(|_| AnnError::lock_poisoned("entry point"))?;
        match *entry_point {
            Some(existing) => Ok(existing),
            None => {
                *entry_point = Some(candidate);
                Ok(candidate)
            }
        }
    }

    fn current_entry_point(&self) -> Result<u32, AnnError> {
        self.entry_point
            .read()
            .map_err(|_| AnnError::lock_poisoned("entry point"))?
            .ok_or_else(|| AnnError::not_initialized("index has no entry point yet"))
    }

    /// The teacher's `search_for_point_and_prune`: greedy search from the
    /// entry point, then α-prune the visited set down to `prune_to`
    /// neighbors for `internal_id`.
    fn search_for_point_and_prune(&self, internal_id: u32, vector: &[f32], entry: u32) -> Result<Vec<u32>, AnnError> {
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let adapted = storage.adapt(self.metric, vector);

        let result = greedy_search(
            &graph,
            adapted.as_ref(),
            &[entry],
            self.build_params.build_search_window_size,
            |_| false,
        )?;

        let mut candidates: Vec<Candidate> = result
            .visited
            .into_iter()
            .filter(|c| c.id != internal_id && status[c.id as usize].is_valid())
            .collect();
        candidates.sort_by(|a, b| self.metric.compare(a.distance, b.distance));

        let pairwise = |a: u32, b: u32| self.metric.distance_f32(&storage.reconstruct(a as usize), &storage.reconstruct(b as usize));
        Ok(alpha_prune(
            &candidates,
            self.build_params.prune_to,
            self.build_params.alpha,
            self.metric.less_is_closer(),
            pairwise,
        ))
    }

    /// The teacher's `inter_insert`/`update_neighbors_of_vertex`: add a
    /// back-edge from `vertex` to `new_id`, re-pruning `vertex`'s full
    /// neighbor set if it would overflow `max_degree`.
    fn inter_insert(&self, vertex: u32, new_id: u32) -> Result<(), AnnError> {
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        if graph.push_unique(vertex as usize, new_id)? {
            return Ok(());
        }
        // Full: re-prune vertex's augmented candidate set.
        let mut candidate_ids = graph.neighbors(vertex as usize)?;
        if candidate_ids.contains(&new_id) {
            return Ok(());
        }
        candidate_ids.push(new_id);

        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let vertex_vector = storage.reconstruct(vertex as usize);
        let mut candidates: Vec<Candidate> = candidate_ids
            .iter()
            .map(|&id| Candidate {
                id,
                distance: self.metric.distance_f32(&vertex_vector, &storage.reconstruct(id as usize)),
            })
            .collect();
        candidates.sort_by(|a, b| self.metric.compare(a.distance, b.distance));

        let pairwise = |a: u32, b: u32| self.metric.distance_f32(&storage.reconstruct(a as usize), &storage.reconstruct(b as usize));
        let pruned = alpha_prune(
            &candidates,
            self.build_params.prune_to,
            self.build_params.alpha,
            self.metric.less_is_closer(),
            pairwise,
        );
        graph.replace(vertex as usize, pruned)?;
        Ok(())
    }

    /// Soft-deletes `external_id`: the id is released immediately (a new
    /// insert may reuse it once consolidation frees the slot) but the
    /// underlying vertex stays in the graph, marked `Deleted`, until
    /// [`consolidate`](Self::consolidate) runs.
    pub fn remove(&self, external_id: u64) -> Result<(), AnnError> {
        let internal_id = {
            let mut translator = self
                .translator
                .write()
                .map_err(|_| AnnError::lock_poisoned("translator"))?;
            translator.remove(external_id)?
        };
        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;
        status[internal_id as usize] = SlotStatus::Deleted;
        Ok(())
    }

    /// Removes every id in `external_ids`, returning how many were
    /// successfully removed. Unlike `remove`, an absent id is skipped
    /// rather than failing the whole batch.
    pub fn remove_selected(&self, external_ids: &[u64]) -> Result<usize, AnnError> {
        let mut removed = 0;
        for &id in external_ids {
            if self.remove(id).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        params: VamanaSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<(u64, f32)>, AnnError> {
        if k == 0 {
            return Err(AnnError::invalid_argument("k must be nonzero"));
        }
        let window = effective_search_window_size(&params, k);
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let entry = self.current_entry_point()?;
        let adapted = storage.adapt(self.metric, query);
        let filter = filter.unwrap_or(&NoFilter);

        let skip = |id: u32| -> bool {
            let status_ok = status.get(id as usize).copied().unwrap_or(SlotStatus::Empty).is_valid();
            if !status_ok {
                return true;
            }
            match translator.get_external(id) {
                Some(external) => !filter.allows(external),
                None => true,
            }
        };

        let result = greedy_search(&graph, adapted.as_ref(), &[entry], window, |_| false)?;
        let best = result.buffer.best_matching(k, |id| !skip(id));
        Ok(best
            .into_iter()
            .filter_map(|c| translator.get_external(c.id).map(|ext| (ext, c.distance)))
            .collect())
    }

    /// Collects every result within `radius` into `sink`. Traversal stops
    /// expanding once the closest unexpanded candidate already falls
    /// outside `radius`, since the buffer is kept sorted by proximity.
    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        sink: &mut dyn RangeSink,
        params: VamanaSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<(), AnnError> {
        if radius < 0.0 {
            return Err(AnnError::invalid_argument("radius must be non-negative"));
        }
        let capacity = effective_search_window_size(&params, 1).max(self.len().max(1));
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let entry = self.current_entry_point()?;
        let adapted = storage.adapt(self.metric, query);
        let filter = filter.unwrap_or(&NoFilter);
        let less_is_closer = self.metric.less_is_closer();

        let within_radius = |distance: f32| {
            if less_is_closer {
                distance <= radius
            } else {
                distance >= radius
            }
        };

        let skip = |id: u32| -> bool {
            let status_ok = status.get(id as usize).copied().unwrap_or(SlotStatus::Empty).is_valid();
            if !status_ok {
                return true;
            }
            match translator.get_external(id) {
                Some(external) => !filter.allows(external),
                None => true,
            }
        };

        let result = greedy_search(&graph, adapted.as_ref(), &[entry], capacity, |buffer| {
            match buffer.peek_unexpanded() {
                Some(c) => !within_radius(c.distance),
                None => true,
            }
        })?;

        for candidate in result.buffer.iter() {
            if skip(candidate.id) {
                continue;
            }
            if within_radius(candidate.distance) {
                if let Some(external) = translator.get_external(candidate.id) {
                    sink.push(external, candidate.distance);
                }
            }
        }
        Ok(())
    }

    /// Two-phase consolidation: prepares a replacement neighbor list for
    /// every vertex whose current list references a `Deleted` id from
    /// `valid-neighbors ∪ valid-neighbors-of-deleted-neighbors`, promotes
    /// the entry point off a deleted vertex first if needed, then commits
    /// every replacement and transitions `Deleted → Empty`.
    pub fn consolidate(&self) -> Result<usize, AnnError> {
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;

        {
            let mut entry_point = self
                .entry_point
                .write()
                .map_err(|_| AnnError::lock_poisoned("entry point"))?;
            if let Some(current) = *entry_point {
                if status[current as usize].is_deleted() {
                    if let Some(replacement) = status.iter().position(|s| s.is_valid()) {
                        *entry_point = Some(replacement as u32);
                    }
                }
            }
        }

        let deleted: HashSet<u32> = status
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_deleted())
            .map(|(i, _)| i as u32)
            .collect();

        // Phase 1 (prepare): compute the replacement list for every live
        // vertex that references a deleted neighbor.
        let mut pending: Vec<(usize, Vec<u32>)> = Vec::new();
        for vertex in 0..graph.n_nodes() {
            if !status[vertex].is_valid() {
                continue;
            }
            let neighbors = graph.neighbors(vertex)?;
            if !neighbors.iter().any(|n| deleted.contains(n)) {
                continue;
            }
            let mut candidate_ids: HashSet<u32> = HashSet::new();
            for &n in &neighbors {
                if deleted.contains(&n) {
                    for nn in graph.neighbors(n as usize)? {
                        if status[nn as usize].is_valid() {
                            candidate_ids.insert(nn);
                        }
                    }
                } else {
                    candidate_ids.insert(n);
                }
            }
            candidate_ids.remove(&(vertex as u32));

            let vertex_vector = storage.reconstruct(vertex);
            let mut candidates: Vec<Candidate> = candidate_ids
                .into_iter()
                .map(|id| Candidate {
                    id,
                    distance: self.metric.distance_f32(&vertex_vector, &storage.reconstruct(id as usize)),
                })
                .collect();
            candidates.sort_by(|a, b| self.metric.compare(a.distance, b.distance));
            let pairwise = |a: u32, b: u32| self.metric.distance_f32(&storage.reconstruct(a as usize), &storage.reconstruct(b as usize));
            let pruned = alpha_prune(
                &candidates,
                self.build_params.prune_to,
                self.build_params.alpha,
                self.metric.less_is_closer(),
                pairwise,
            );
            pending.push((vertex, pruned));
        }

        // Phase 2 (commit).
        for (vertex, new_neighbors) in &pending {
            graph.replace(*vertex, new_neighbors.iter().copied())?;
        }
        let consolidated = deleted.len();
        for id in &deleted {
            status[*id as usize] = SlotStatus::Empty;
        }
        logging::log_line(
            logging::Level::Info,
            format_args!("vamana consolidate: {consolidated} slots reclaimed, {} vertices re-pruned", pending.len()),
        );
        Ok(consolidated)
    }

    /// Offline compaction: renumbers every `Valid` slot down to a dense
    /// `0..n_live` range, dropping `Empty` trailing capacity. Must not run
    /// concurrently with any search or insert — the caller is responsible
    /// for that exclusion, matching `spec.md` §4.9's documented precondition.
    pub fn compact(&self) -> Result<(), AnnError> {
        let mut storage = self.storage.write().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let mut graph = self.graph.write().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let mut translator = self
            .translator
            .write()
            .map_err(|_| AnnError::lock_poisoned("translator"))?;
        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;
        let mut entry_point = self
            .entry_point
            .write()
            .map_err(|_| AnnError::lock_poisoned("entry point"))?;

        let old_to_new: Vec<Option<u32>> = {
            let mut next = 0u32;
            status
                .iter()
                .map(|s| {
                    if s.is_valid() {
                        let assigned = next;
                        next += 1;
                        Some(assigned)
                    } else {
                        None
                    }
                })
                .collect()
        };
        let n_live = old_to_new.iter().filter(|m| m.is_some()).count();

        let mut new_storage = Storage::new(storage.kind(), storage.dim());
        let mut new_neighbor_lists: Vec<Vec<u32>> = vec![Vec::new(); n_live];
        for (old_id, mapped) in old_to_new.iter().enumerate() {
            let Some(new_id) = mapped else { continue };
            new_storage.append(&storage.reconstruct(old_id))?;
            let remapped: Vec<u32> = graph
                .neighbors(old_id)?
                .into_iter()
                .filter_map(|n| old_to_new[n as usize])
                .collect();
            new_neighbor_lists[*new_id as usize] = remapped;
        }

        let old_external_ids: Vec<(u64, u32)> = translator
            .external_ids()
            .filter_map(|external| {
                let old_internal = translator.get_internal(external)?;
                old_to_new[old_internal as usize].map(|new_internal| (external, new_internal))
            })
            .collect();
        let mut new_translator = IdTranslator::new();
        for (external, new_internal) in old_external_ids {
            new_translator.insert(external)?;
            new_translator.remap_internal(external, new_internal)?;
        }

        *entry_point = entry_point.and_then(|e| old_to_new.get(e as usize).copied().flatten());
        *storage = new_storage;
        let mut rebuilt_graph = InMemoryGraph::new(n_live, graph.max_degree());
        for (new_id, neighbors) in new_neighbor_lists.into_iter().enumerate() {
            rebuilt_graph.replace(new_id, neighbors)?;
        }
        *graph = rebuilt_graph;
        *translator = new_translator;
        *status = vec![SlotStatus::Valid; n_live];
        logging::log_line(logging::Level::Info, format_args!("vamana compact: {n_live} live vertices retained"));
        Ok(())
    }

    pub fn save(&self, mut writer: impl io::Write) -> Result<(), AnnError> {
        let manifest = Manifest {
            schema: SCHEMA_NAME.to_string(),
            version: SCHEMA_VERSION,
        };
        bincode::serialize_into(&mut writer, &manifest).map_err(|e| AnnError::runtime(format!("failed to write manifest: {e}")))?;

        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let graph = self.graph.read().map_err(|_| AnnError::lock_poisoned("graph"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let entry_point = self.entry_point.read().map_err(|_| AnnError::lock_poisoned("entry point"))?;

        let snapshot = Snapshot {
            metric: self.metric,
            build_params: self.build_params,
            storage: clone_storage(&storage)?,
            graph: graph.snapshot()?,
            translator: translator.clone(),
            status: status.clone(),
            entry_point: *entry_point,
        };
        bincode::serialize_into(&mut writer, &snapshot).map_err(|e| AnnError::runtime(format!("failed to write vamana snapshot: {e}")))?;
        Ok(())
    }

    pub fn load(mut reader: impl io::Read) -> Result<Self, AnnError> {
        let manifest: Manifest =
            bincode::deserialize_from(&mut reader).map_err(|e| AnnError::runtime(format!("failed to read manifest: {e}")))?;
        if manifest.schema != SCHEMA_NAME {
            return Err(AnnError::runtime(format!(
                "unrecognized schema '{}', expected '{SCHEMA_NAME}'",
                manifest.schema
            )));
        }
        if manifest.version != SCHEMA_VERSION {
            return Err(AnnError::runtime(format!(
                "unsupported vamana schema version {}",
                manifest.version
            )));
        }
        let snapshot: Snapshot =
            bincode::deserialize_from(&mut reader).map_err(|e| AnnError::runtime(format!("failed to read vamana snapshot: {e}")))?;
        let pool = WorkerPool::shared(snapshot.build_params.num_threads)?;
        Ok(DynamicVamanaIndex {
            metric: snapshot.metric,
            build_params: snapshot.build_params,
            storage: RwLock::new(snapshot.storage),
            graph: RwLock::new(InMemoryGraph::from_snapshot(snapshot.graph)),
            translator: RwLock::new(snapshot.translator),
            status: RwLock::new(snapshot.status),
            entry_point: RwLock::new(snapshot.entry_point),
            pool,
        })
    }
}

/// `Storage` does not implement `Clone` (its backing `BlockedStore`s are
/// meant to grow in place, not be duplicated casually); `save` needs an
/// owned copy to hand to `bincode` without holding the read lock open
/// across the whole serialize call, so it round-trips through a
/// bincode-encoded buffer instead of adding a `Clone` impl that would
/// invite accidental full-index copies elsewhere.
fn clone_storage(storage: &Storage) -> Result<Storage, AnnError> {
    let bytes = bincode::serialize(storage).map_err(|e| AnnError::runtime(format!("failed to snapshot storage: {e}")))?;
    bincode::deserialize(&bytes).map_err(|e| AnnError::runtime(format!("failed to snapshot storage: {e}")))
}

fn nearest_to_centroid(vectors: &[Vec<f32>], metric: Metric) -> usize {
    let dim = vectors[0].len();
    let mut centroid = vec![0.0f32; dim];
    for v in vectors {
        for (c, &x) in centroid.iter_mut().zip(v.iter()) {
            *c += x;
        }
    }
    let n = vectors.len() as f32;
    for c in centroid.iter_mut() {
        *c /= n;
    }
    vectors
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            metric
                .distance_f32(&centroid, a)
                .partial_cmp(&metric.distance_f32(&centroid, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vamana::config::VamanaBuildParametersBuilder;

    fn build_params() -> VamanaBuildParameters {
        VamanaBuildParametersBuilder::new()
            .max_degree(8)
            .build(Metric::L2)
            .unwrap()
    }

    fn grid_vectors(n: usize) -> (Vec<Vec<f32>>, Vec<u64>) {
        let vectors: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, (i % 7) as f32]).collect();
        let ids: Vec<u64> = (0..n).map(|i| 1000 + i as u64).collect();
        (vectors, ids)
    }

    #[test]
    fn build_then_search_finds_nearest_vector() {
        let (vectors, ids) = grid_vectors(50);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        let results = index
            .search(&[25.1, 4.0], 3, VamanaSearchParameters::default(), None)
            .unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().any(|&(id, _)| id == ids[25]));
    }

    #[test]
    fn add_after_build_is_searchable() {
        let (vectors, ids) = grid_vectors(30);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        index.add(99999, &[500.0, 500.0]).unwrap();
        let results = index
            .search(&[500.0, 500.0], 1, VamanaSearchParameters::default(), None)
            .unwrap();
        assert_eq!(results[0].0, 99999);
    }

    #[test]
    fn removed_id_is_absent_from_search_but_has_id_is_false() {
        let (vectors, ids) = grid_vectors(30);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        index.remove(ids[10]).unwrap();
        assert!(!index.has_id(ids[10]));
        let results = index
            .search(&[10.0, 3.0], 30, VamanaSearchParameters::default(), None)
            .unwrap();
        assert!(results.iter().all(|&(id, _)| id != ids[10]));
    }

    #[test]
    fn consolidate_then_compact_shrinks_the_index() {
        let (vectors, ids) = grid_vectors(40);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        for &id in ids.iter().take(10) {
            index.remove(id).unwrap();
        }
        let reclaimed = index.consolidate().unwrap();
        assert_eq!(reclaimed, 10);
        index.compact().unwrap();
        assert_eq!(index.len(), 30);
        let results = index
            .search(&[20.0, 6.0], 5, VamanaSearchParameters::default(), None)
            .unwrap();
        assert!(!results.is_empty());
    }

    #[test]
    fn range_search_only_returns_points_within_radius() {
        let (vectors, ids) = grid_vectors(30);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        let mut sink = crate::common::range_sink::VecRangeSink::new();
        index
            .range_search(&[15.0, 3.0], 4.0, &mut sink, VamanaSearchParameters::default(), None)
            .unwrap();
        for (_, distance) in &sink.results {
            assert!(*distance <= 4.0);
        }
    }

    #[test]
    fn save_then_load_round_trips_search_results() {
        let (vectors, ids) = grid_vectors(25);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        let mut buffer = Vec::new();
        index.save(&mut buffer).unwrap();
        let restored = DynamicVamanaIndex::load(buffer.as_slice()).unwrap();
        assert_eq!(restored.len(), index.len());
        let before = index.search(&[12.0, 5.0], 3, VamanaSearchParameters::default(), None).unwrap();
        let after = restored.search(&[12.0, 5.0], 3, VamanaSearchParameters::default(), None).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn search_with_filter_excludes_disallowed_ids() {
        let (vectors, ids) = grid_vectors(30);
        let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, build_params()).unwrap();
        let excluded = ids[15];
        let filter = move |id: u64| id != excluded;
        let results = index
            .search(&[15.0, 1.0], 30, VamanaSearchParameters::default(), Some(&filter))
            .unwrap();
        assert!(results.iter().all(|&(id, _)| id != excluded));
    }
}
