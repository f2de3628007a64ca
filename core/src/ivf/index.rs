// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The dynamic inverted-file (IVF) index: vectors are partitioned across
//! k-means centroids, and a query scans only the `n_probes` closest
//! clusters instead of every stored vector.
//!
//! Grounded in `original_source`'s `dynamic_ivf.h`: a centroid table, a
//! `Vec<Cluster>` of block-allocated per-cluster storage addressed by
//! `(cluster, position)`, and the two-level `InterQueryThreadPool`/
//! `IntraQueryThreadPool` search split generalized here onto
//! [`crate::concurrency::WorkerPool::nested_for_each`]. Unlike Vamana, a
//! cluster's members are found by scanning `Cluster::iter_members`
//! directly rather than through a separate internal-id reverse index.

use std::io;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use vector::Metric;

use crate::common::error::AnnError;
use crate::common::filter::{IdFilter, NoFilter};
use crate::common::range_sink::RangeSink;
use crate::common::status::SlotStatus;
use crate::concurrency::WorkerPool;
use crate::ivf::cluster::Cluster;
use crate::ivf::config::{IvfBuildParameters, IvfSearchParameters};
use crate::ivf::kmeans::{nearest_centroid, train_flat, train_hierarchical};
use crate::logging;
use crate::translator::IdTranslator;

const SCHEMA_NAME: &str = "annidx.ivf";
const SCHEMA_VERSION: u32 = 1;

pub struct DynamicIvfIndex {
    metric: Metric,
    dim: usize,
    build_params: IvfBuildParameters,
    clusters: RwLock<Vec<Cluster>>,
    translator: RwLock<IdTranslator>,
    status: RwLock<Vec<SlotStatus>>,
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
    dim: usize,
    build_params: IvfBuildParameters,
    clusters: Vec<Cluster>,
    translator: IdTranslator,
    status: Vec<SlotStatus>,
}

impl DynamicIvfIndex {
    pub fn build(
        vectors: &[Vec<f32>],
        external_ids: &[u64],
        metric: Metric,
        build_params: IvfBuildParameters,
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

        let centroids = if build_params.n_clusters > build_params.hierarchical_threshold {
            train_hierarchical(
                vectors,
                build_params.n_clusters,
                metric,
                build_params.kmeans_max_iterations,
                build_params.kmeans_n_redo,
                build_params.seed,
            )
        } else {
            train_flat(
                vectors,
                build_params.n_clusters,
                metric,
                build_params.kmeans_max_iterations,
                build_params.kmeans_n_redo,
                build_params.seed,
            )
        };
        if centroids.is_empty() {
            return Err(AnnError::runtime("k-means training produced no centroids"));
        }

        let mut clusters: Vec<Cluster> = centroids.into_iter().map(Cluster::new).collect();
        let centroid_list = centroid_refs(&clusters);
        let mut translator = IdTranslator::new();
        let mut status = Vec::with_capacity(vectors.len());

        for (i, v) in vectors.iter().enumerate() {
            let internal_id = translator.insert(external_ids[i])?;
            let nearest = nearest_centroid(v, &centroid_list, metric);
            clusters[nearest].push(internal_id, v);
            status.push(SlotStatus::Valid);
        }

        let pool = WorkerPool::shared(build_params.num_threads)?;
        logging::log_line(
            logging::Level::Info,
            format_args!("ivf build complete: {} vectors across {} clusters", vectors.len(), clusters.len()),
        );
        Ok(DynamicIvfIndex {
            metric,
            dim,
            build_params,
            clusters: RwLock::new(clusters),
            translator: RwLock::new(translator),
            status: RwLock::new(status),
            pool,
        })
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

    pub fn n_clusters(&self) -> usize {
        self.clusters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Assigns `vector` to its nearest centroid and appends it there.
    /// Transactional with respect to translator registration: if the id
    /// already exists, nothing else is touched.
    pub fn add(&self, external_id: u64, vector: &[f32]) -> Result<(), AnnError> {
        if vector.len() != self.dim {
            return Err(AnnError::invalid_argument(format!(
                "expected dimension {}, got {}",
                self.dim,
                vector.len()
            )));
        }
        let internal_id = {
            let mut translator = self
                .translator
                .write()
                .map_err(|_| AnnError::lock_poisoned("translator"))?;
            translator.insert(external_id)?
        };

        let mut clusters = self.clusters.write().map_err(|_| AnnError::lock_poisoned("clusters"))?;
        let nearest = nearest_centroid(vector, &centroid_refs(&clusters), self.metric);
        clusters[nearest].push(internal_id, vector);
        drop(clusters);

        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;
        if status.len() <= internal_id as usize {
            status.resize(internal_id as usize + 1, SlotStatus::Empty);
        }
        status[internal_id as usize] = SlotStatus::Valid;
        Ok(())
    }

    /// Marks `external_id` empty. No data movement — the stale entry is
    /// skipped by search via `status` and reclaimed only by
    /// [`compact`](Self::compact), matching `dynamic_ivf.h`'s deletion
    /// contract.
    pub fn remove(&self, external_id: u64) -> Result<(), AnnError> {
        let internal_id = {
            let mut translator = self
                .translator
                .write()
                .map_err(|_| AnnError::lock_poisoned("translator"))?;
            translator.remove(external_id)?
        };
        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;
        status[internal_id as usize] = SlotStatus::Empty;
        Ok(())
    }

    pub fn remove_selected(&self, external_ids: &[u64]) -> Result<usize, AnnError> {
        let mut removed = 0;
        for &id in external_ids {
            if self.remove(id).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// The IVF index has no soft-delete tombstone phase distinct from its
    /// own immediate `Empty` marking (`spec.md` §3's binary IVF slot
    /// status) — consolidation is a documented no-op, kept only so callers
    /// that drive both index kinds through one interface do not need to
    /// special-case IVF.
    pub fn consolidate(&self) -> Result<usize, AnnError> {
        Ok(0)
    }

    /// Rebuilds every cluster's storage densely, dropping `Empty` slots and
    /// reassigning internal ids, then re-registers the translator under the
    /// new ids. `spec.md` §4.9/§4.10's offline-only precondition applies
    /// here exactly as for Vamana's compaction.
    pub fn compact(&self) -> Result<(), AnnError> {
        let mut clusters = self.clusters.write().map_err(|_| AnnError::lock_poisoned("clusters"))?;
        let mut translator = self
            .translator
            .write()
            .map_err(|_| AnnError::lock_poisoned("translator"))?;
        let mut status = self.status.write().map_err(|_| AnnError::lock_poisoned("status"))?;

        let mut rebuilt: Vec<Cluster> = clusters
            .iter()
            .map(|c| Cluster::new(c.centroid.clone()))
            .collect();
        let mut old_to_new: Vec<Option<u32>> = vec![None; status.len()];
        let mut next_id = 0u32;

        for (cluster_idx, cluster) in clusters.iter().enumerate() {
            for (position, internal_id) in cluster.iter_members() {
                if !status.get(internal_id as usize).copied().unwrap_or(SlotStatus::Empty).is_valid() {
                    continue;
                }
                let vector = cluster.vector_at(position).to_vec();
                let new_internal = next_id;
                next_id += 1;
                rebuilt[cluster_idx].push(new_internal, &vector);
                old_to_new[internal_id as usize] = Some(new_internal);
            }
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

        let n_live = next_id as usize;
        *clusters = rebuilt;
        *translator = new_translator;
        *status = vec![SlotStatus::Valid; n_live];
        logging::log_line(logging::Level::Info, format_args!("ivf compact: {n_live} live vectors retained"));
        Ok(())
    }

    /// Batch k-NN search: for every query, picks the `n_probes` closest
    /// centroids (computed via one query-centroid distance matrix), scans
    /// each probed cluster collecting up to `k_reorder * k` candidates per
    /// cluster, then trims to the global top-`k`. Queries run across an
    /// outer partition of the worker pool; each query's probed clusters
    /// scan across an inner partition, honoring
    /// `num_threads_outer * num_threads_inner <= total threads`
    /// (`dynamic_ivf.h`'s nested thread-pool split).
    pub fn search_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<Vec<(u64, f32)>>, AnnError> {
        if k == 0 {
            return Err(AnnError::invalid_argument("k must be nonzero"));
        }
        let clusters = self.clusters.read().map_err(|_| AnnError::lock_poisoned("clusters"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let filter = filter.unwrap_or(&NoFilter);

        let results = std::sync::Mutex::new(vec![Vec::new(); queries.len()]);
        self.pool.nested_for_each(queries.len(), params.num_threads_inner.max(1), |qi, _inner_width| {
            let query = &queries[qi];
            let probed = select_probes(query, &clusters, self.metric, params.n_probes);
            let overshoot = (params.k_reorder.max(1)) * k;

            let mut candidates: Vec<(u64, f32)> = Vec::new();
            for &cluster_idx in &probed {
                let cluster = &clusters[cluster_idx];
                let mut cluster_candidates: Vec<(u32, f32)> = cluster
                    .iter_members()
                    .filter(|(_, internal_id)| status.get(*internal_id as usize).copied().unwrap_or(SlotStatus::Empty).is_valid())
                    .map(|(position, internal_id)| (internal_id, self.metric.distance_f32(query, cluster.vector_at(position))))
                    .collect();
                cluster_candidates.sort_by(|a, b| self.metric.compare(a.1, b.1));
                cluster_candidates.truncate(overshoot);
                for (internal_id, distance) in cluster_candidates {
                    if let Some(external) = translator.get_external(internal_id) {
                        if filter.allows(external) {
                            candidates.push((external, distance));
                        }
                    }
                }
            }
            candidates.sort_by(|a, b| self.metric.compare(a.1, b.1));
            candidates.truncate(k);
            results.lock().unwrap_or_else(|e| e.into_inner())[qi] = candidates;
            Ok(())
        })?;

        Ok(results.into_inner().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<(u64, f32)>, AnnError> {
        let mut batch = self.search_batch(std::slice::from_ref(&query.to_vec()), k, params, filter)?;
        Ok(batch.pop().unwrap_or_default())
    }

    /// Range search scans every probed cluster exhaustively (IVF has no
    /// graph-proximity ordering to cut traversal short on) and pushes every
    /// match into `sink`.
    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        sink: &mut dyn RangeSink,
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<(), AnnError> {
        if radius < 0.0 {
            return Err(AnnError::invalid_argument("radius must be non-negative"));
        }
        let clusters = self.clusters.read().map_err(|_| AnnError::lock_poisoned("clusters"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let filter = filter.unwrap_or(&NoFilter);
        let less_is_closer = self.metric.less_is_closer();
        let within_radius = |distance: f32| if less_is_closer { distance <= radius } else { distance >= radius };

        let probed = select_probes(query, &clusters, self.metric, params.n_probes);
        for cluster_idx in probed {
            let cluster = &clusters[cluster_idx];
            for (position, internal_id) in cluster.iter_members() {
                if !status.get(internal_id as usize).copied().unwrap_or(SlotStatus::Empty).is_valid() {
                    continue;
                }
                let distance = self.metric.distance_f32(query, cluster.vector_at(position));
                if !within_radius(distance) {
                    continue;
                }
                if let Some(external) = translator.get_external(internal_id) {
                    if filter.allows(external) {
                        sink.push(external, distance);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn save(&self, mut writer: impl io::Write) -> Result<(), AnnError> {
        let manifest = Manifest {
            schema: SCHEMA_NAME.to_string(),
            version: SCHEMA_VERSION,
        };
        bincode::serialize_into(&mut writer, &manifest).map_err(|e| AnnError::runtime(format!("failed to write manifest: {e}")))?;

        let clusters = self.clusters.read().map_err(|_| AnnError::lock_poisoned("clusters"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let status = self.status.read().map_err(|_| AnnError::lock_poisoned("status"))?;

        let snapshot = Snapshot {
            metric: self.metric,
            dim: self.dim,
            build_params: self.build_params,
            clusters: clone_clusters(&clusters)?,
            translator: translator.clone(),
            status: status.clone(),
        };
        bincode::serialize_into(&mut writer, &snapshot).map_err(|e| AnnError::runtime(format!("failed to write ivf snapshot: {e}")))?;
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
            return Err(AnnError::runtime(format!("unsupported ivf schema version {}", manifest.version)));
        }
        let snapshot: Snapshot =
            bincode::deserialize_from(&mut reader).map_err(|e| AnnError::runtime(format!("failed to read ivf snapshot: {e}")))?;
        let pool = WorkerPool::shared(snapshot.build_params.num_threads)?;
        Ok(DynamicIvfIndex {
            metric: snapshot.metric,
            dim: snapshot.dim,
            build_params: snapshot.build_params,
            clusters: RwLock::new(snapshot.clusters),
            translator: RwLock::new(snapshot.translator),
            status: RwLock::new(snapshot.status),
            pool,
        })
    }
}

fn centroid_refs(clusters: &[Cluster]) -> Vec<Vec<f32>> {
    clusters.iter().map(|c| c.centroid.clone()).collect()
}

fn select_probes(query: &[f32], clusters: &[Cluster], metric: Metric, n_probes: usize) -> Vec<usize> {
    let mut distances: Vec<(usize, f32)> = clusters
        .iter()
        .enumerate()
        .map(|(i, c)| (i, metric.distance_f32(query, &c.centroid)))
        .collect();
    distances.sort_by(|a, b| metric.compare(a.1, b.1));
    distances.truncate(n_probes.max(1).min(clusters.len()));
    distances.into_iter().map(|(i, _)| i).collect()
}

fn clone_clusters(clusters: &[Cluster]) -> Result<Vec<Cluster>, AnnError> {
    let bytes = bincode::serialize(clusters).map_err(|e| AnnError::runtime(format!("failed to snapshot clusters: {e}")))?;
    bincode::deserialize(&bytes).map_err(|e| AnnError::runtime(format!("failed to snapshot clusters: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ivf::config::{IvfBuildParametersBuilder, IvfSearchParametersBuilder};

    fn grid_vectors(n: usize) -> (Vec<Vec<f32>>, Vec<u64>) {
        let vectors: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, (i % 7) as f32]).collect();
        let ids: Vec<u64> = (0..n).map(|i| 2000 + i as u64).collect();
        (vectors, ids)
    }

    #[test]
    fn build_then_search_finds_nearest_vector() {
        let (vectors, ids) = grid_vectors(60);
        let params = IvfBuildParametersBuilder::new().n_clusters(6).build(vectors.len()).unwrap();
        let index = DynamicIvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        let search_params = IvfSearchParametersBuilder::new().n_probes(6).build();
        let results = index.search(&[30.1, 2.0], 3, search_params, None).unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().any(|&(id, _)| id == ids[30]));
    }

    #[test]
    fn removed_id_is_absent_from_search() {
        let (vectors, ids) = grid_vectors(50);
        let params = IvfBuildParametersBuilder::new().n_clusters(5).build(vectors.len()).unwrap();
        let index = DynamicIvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        index.remove(ids[20]).unwrap();
        assert!(!index.has_id(ids[20]));
        let search_params = IvfSearchParametersBuilder::new().n_probes(5).build();
        let results = index.search(&[20.0, 6.0], 50, search_params, None).unwrap();
        assert!(results.iter().all(|&(id, _)| id != ids[20]));
    }

    #[test]
    fn compact_shrinks_the_index_after_removals() {
        let (vectors, ids) = grid_vectors(40);
        let params = IvfBuildParametersBuilder::new().n_clusters(4).build(vectors.len()).unwrap();
        let index = DynamicIvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        for &id in ids.iter().take(10) {
            index.remove(id).unwrap();
        }
        index.compact().unwrap();
        assert_eq!(index.len(), 30);
    }

    #[test]
    fn add_after_build_is_searchable() {
        let (vectors, ids) = grid_vectors(30);
        let params = IvfBuildParametersBuilder::new().n_clusters(3).build(vectors.len()).unwrap();
        let index = DynamicIvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        index.add(99999, &[500.0, 500.0]).unwrap();
        let search_params = IvfSearchParametersBuilder::new().n_probes(4).build();
        let results = index.search(&[500.0, 500.0], 1, search_params, None).unwrap();
        assert_eq!(results[0].0, 99999);
    }

    #[test]
    fn save_then_load_round_trips_search_results() {
        let (vectors, ids) = grid_vectors(40);
        let params = IvfBuildParametersBuilder::new().n_clusters(4).build(vectors.len()).unwrap();
        let index = DynamicIvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        let mut buffer = Vec::new();
        index.save(&mut buffer).unwrap();
        let restored = DynamicIvfIndex::load(buffer.as_slice()).unwrap();
        assert_eq!(restored.len(), index.len());
        let search_params = IvfSearchParametersBuilder::new().n_probes(4).build();
        let before = index.search(&[10.0, 3.0], 3, search_params, None).unwrap();
        let after = restored.search(&[10.0, 3.0], 3, search_params, None).unwrap();
        assert_eq!(before, after);
    }
}
