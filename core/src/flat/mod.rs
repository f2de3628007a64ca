// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! A brute-force exhaustive index: every query is scored against every
//! stored vector. No graph, no clustering, no approximation — this exists
//! both as a usable standalone index for small collections and as the
//! ground-truth recall oracle the workspace's own tests compare Vamana and
//! IVF results against (`spec.md` §8's testable-properties requirement).
//!
//! Grounded in the teacher's `InmemIndex::search` linear-scan fallback path
//! used when the graph has too few nodes to beam-search usefully, and in
//! `crate::search::buffer::SearchBuffer` for the bounded top-k collection
//! already shared by both graph and IVF search.

use std::io;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use vector::Metric;

use crate::common::error::AnnError;
use crate::common::filter::{IdFilter, NoFilter};
use crate::common::range_sink::RangeSink;
use crate::search::buffer::{Candidate, SearchBuffer};
use crate::store::backend::{ElementKind, Storage, StorageBackend};
use crate::translator::IdTranslator;

const SCHEMA_NAME: &str = "annidx.flat";
const SCHEMA_VERSION: u32 = 1;

/// An exhaustive index with no insertion-time index structure to maintain:
/// `add` is an `O(1)` append, `search` is an `O(n)` scan. Deletion is
/// immediate and final — there is no soft-delete phase to consolidate,
/// since nothing references a deleted vector's position the way a graph's
/// neighbor lists or a cluster's centroid assignment would.
pub struct FlatIndex {
    metric: Metric,
    storage: RwLock<Storage>,
    translator: RwLock<IdTranslator>,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    schema: String,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    metric: Metric,
    storage: Storage,
    translator: IdTranslator,
}

impl FlatIndex {
    pub fn new_empty(dim: usize, metric: Metric, element_kind: ElementKind) -> Result<Self, AnnError> {
        if dim == 0 {
            return Err(AnnError::invalid_argument("dim must be nonzero"));
        }
        Ok(FlatIndex {
            metric,
            storage: RwLock::new(Storage::new(element_kind, dim)),
            translator: RwLock::new(IdTranslator::new()),
        })
    }

    pub fn build(
        vectors: &[Vec<f32>],
        external_ids: &[u64],
        metric: Metric,
        element_kind: ElementKind,
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
        let index = Self::new_empty(dim, metric, element_kind)?;
        for (v, &id) in vectors.iter().zip(external_ids) {
            index.add(id, v)?;
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.translator.read().unwrap_or_else(|e| e.into_inner()).len()
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
        let mut translator = self.translator.write().map_err(|_| AnnError::lock_poisoned("translator"))?;
        translator.insert(external_id)?;
        let mut storage = self.storage.write().map_err(|_| AnnError::lock_poisoned("storage"))?;
        storage.append(vector)?;
        Ok(())
    }

    /// Final removal: unlike Vamana/IVF there is no neighbor list or
    /// cluster membership referencing a position by internal id, so the
    /// translator binding is simply dropped. The storage slot itself is
    /// never reclaimed until the caller rebuilds the index — scans always
    /// walk every translator-reachable id, so an orphaned slot is never
    /// visited.
    pub fn remove(&self, external_id: u64) -> Result<(), AnnError> {
        let mut translator = self.translator.write().map_err(|_| AnnError::lock_poisoned("translator"))?;
        translator.remove(external_id)?;
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

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<(u64, f32)>, AnnError> {
        if k == 0 {
            return Err(AnnError::invalid_argument("k must be nonzero"));
        }
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let filter = filter.unwrap_or(&NoFilter);
        let adapted = storage.adapt(self.metric, query);

        let mut buffer = SearchBuffer::new(k, self.metric.less_is_closer());
        for internal_id in 0..storage.len() {
            let Some(external) = translator.get_external(internal_id as u32) else {
                continue;
            };
            if !filter.allows(external) {
                continue;
            }
            let distance = adapted.compute(internal_id);
            buffer.insert(Candidate { id: internal_id as u32, distance });
        }

        let best = buffer.best_matching(k, |_| true);
        Ok(best
            .into_iter()
            .filter_map(|c| translator.get_external(c.id).map(|ext| (ext, c.distance)))
            .collect())
    }

    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        sink: &mut dyn RangeSink,
        filter: Option<&dyn IdFilter>,
    ) -> Result<(), AnnError> {
        if radius < 0.0 {
            return Err(AnnError::invalid_argument("radius must be non-negative"));
        }
        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let filter = filter.unwrap_or(&NoFilter);
        let adapted = storage.adapt(self.metric, query);
        let less_is_closer = self.metric.less_is_closer();
        let within_radius = |distance: f32| if less_is_closer { distance <= radius } else { distance >= radius };

        for internal_id in 0..storage.len() {
            let Some(external) = translator.get_external(internal_id as u32) else {
                continue;
            };
            if !filter.allows(external) {
                continue;
            }
            let distance = adapted.compute(internal_id);
            if within_radius(distance) {
                sink.push(external, distance);
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

        let storage = self.storage.read().map_err(|_| AnnError::lock_poisoned("storage"))?;
        let translator = self.translator.read().map_err(|_| AnnError::lock_poisoned("translator"))?;
        let snapshot = Snapshot {
            metric: self.metric,
            storage: clone_storage(&storage)?,
            translator: translator.clone(),
        };
        bincode::serialize_into(&mut writer, &snapshot).map_err(|e| AnnError::runtime(format!("failed to write flat snapshot: {e}")))?;
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
            return Err(AnnError::runtime(format!("unsupported flat schema version {}", manifest.version)));
        }
        let snapshot: Snapshot =
            bincode::deserialize_from(&mut reader).map_err(|e| AnnError::runtime(format!("failed to read flat snapshot: {e}")))?;
        Ok(FlatIndex {
            metric: snapshot.metric,
            storage: RwLock::new(snapshot.storage),
            translator: RwLock::new(snapshot.translator),
        })
    }
}

fn clone_storage(storage: &Storage) -> Result<Storage, AnnError> {
    let bytes = bincode::serialize(storage).map_err(|e| AnnError::runtime(format!("failed to snapshot storage: {e}")))?;
    bincode::deserialize(&bytes).map_err(|e| AnnError::runtime(format!("failed to snapshot storage: {e}")))
}

/// Computes recall@k of `approx` against `exact`, both assumed sorted
/// closest-first: the fraction of `exact`'s top-`k` external ids that also
/// appear anywhere in `approx`. Used by this workspace's own tests to check
/// Vamana/IVF results against a [`FlatIndex`] oracle rather than asserting
/// exact output equality, since both are approximate by construction.
pub fn recall_at_k(approx: &[(u64, f32)], exact: &[(u64, f32)], k: usize) -> f32 {
    if k == 0 || exact.is_empty() {
        return 1.0;
    }
    let exact_top_k: std::collections::HashSet<u64> = exact.iter().take(k).map(|&(id, _)| id).collect();
    let found = approx.iter().filter(|&&(id, _)| exact_top_k.contains(&id)).count();
    found as f32 / exact_top_k.len() as f32
}
