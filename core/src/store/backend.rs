// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Concrete storage backends.
//!
//! Every backend stores vectors as some element type (`f32`, `f16`, `i8`)
//! but presents the same `f32`-in, `f32`-distance-out [`StorageBackend`]
//! surface, so the graph and IVF index logic above never has to know which
//! element type backs the index they're operating on. Callers always pass
//! and receive full-precision `f32` vectors; narrower backends convert on
//! the way in and accumulate distances in `f32` on the way out, matching
//! the accumulation contract in `vector::kernels`.

use half::f16;
use serde::{Deserialize, Serialize};
use vector::Metric;

use super::blocked::BlockedStore;
use super::distance_adapter::AdaptedDistance;
use crate::common::error::AnnError;

/// The element kind a backend was constructed with, recorded so `save`/
/// `load` can pick the right concrete type back out of a type-erased
/// archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Float32,
    Float16,
    Int8,
}

/// Dense vector storage polymorphic over element type.
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> ElementKind;
    fn dim(&self) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `vector` (always full precision) and returns the internal
    /// id assigned to it.
    fn append(&mut self, vector: &[f32]) -> Result<usize, AnnError>;

    /// Overwrites the vector at `internal_id` in place, growing the
    /// backend if `internal_id` is beyond its current length (used by
    /// slot-recycling insert paths).
    fn set(&mut self, internal_id: usize, vector: &[f32]) -> Result<(), AnnError>;

    /// Full-precision reconstruction, used for reranking and for the
    /// oracle-style brute-force index.
    fn reconstruct(&self, internal_id: usize) -> Vec<f32>;

    /// Fixes `query` against this backend under `metric`, returning an
    /// adapter ready to be compared against any internal id.
    fn adapt<'a>(&'a self, metric: Metric, query: &[f32]) -> Box<dyn AdaptedDistance + 'a>;

    /// A higher-precision backend to rerank candidates against, for
    /// quantized backends that want exact distances on the final
    /// shortlist. `None` for backends that already are full precision.
    fn secondary(&self) -> Option<&dyn StorageBackend> {
        None
    }

    fn truncate(&mut self, new_len: usize);
}

fn validate_dim(expected: usize, got: usize) -> Result<(), AnnError> {
    if expected != got {
        return Err(AnnError::invalid_argument(format!(
            "expected dimension {expected}, got {got}"
        )));
    }
    Ok(())
}

#[derive(Serialize, Deserialize)]
pub struct Float32Storage {
    store: BlockedStore<f32>,
}

impl Float32Storage {
    pub fn new(dim: usize) -> Self {
        Float32Storage {
            store: BlockedStore::new(dim),
        }
    }
}

struct Float32Adapter<'a> {
    store: &'a BlockedStore<f32>,
    query: Vec<f32>,
    metric: Metric,
}

impl AdaptedDistance for Float32Adapter<'_> {
    fn compute(&self, internal_id: usize) -> f32 {
        self.metric.distance_f32(&self.query, self.store.get(internal_id))
    }

    fn less_is_closer(&self) -> bool {
        self.metric.less_is_closer()
    }
}

impl StorageBackend for Float32Storage {
    fn kind(&self) -> ElementKind {
        ElementKind::Float32
    }

    fn dim(&self) -> usize {
        self.store.item_len()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn append(&mut self, vector: &[f32]) -> Result<usize, AnnError> {
        validate_dim(self.dim(), vector.len())?;
        Ok(self.store.push(vector))
    }

    fn set(&mut self, internal_id: usize, vector: &[f32]) -> Result<(), AnnError> {
        validate_dim(self.dim(), vector.len())?;
        self.store.set(internal_id, vector);
        Ok(())
    }

    fn reconstruct(&self, internal_id: usize) -> Vec<f32> {
        self.store.get(internal_id).to_vec()
    }

    fn adapt<'a>(&'a self, metric: Metric, query: &[f32]) -> Box<dyn AdaptedDistance + 'a> {
        Box::new(Float32Adapter {
            store: &self.store,
            query: query.to_vec(),
            metric,
        })
    }

    fn truncate(&mut self, new_len: usize) {
        self.store.truncate(new_len);
    }
}

#[derive(Serialize, Deserialize)]
pub struct Float16Storage {
    store: BlockedStore<f16>,
}

impl Float16Storage {
    pub fn new(dim: usize) -> Self {
        Float16Storage {
            store: BlockedStore::new(dim),
        }
    }
}

struct Float16Adapter<'a> {
    store: &'a BlockedStore<f16>,
    query: Vec<f16>,
    metric: Metric,
}

impl AdaptedDistance for Float16Adapter<'_> {
    fn compute(&self, internal_id: usize) -> f32 {
        self.metric.distance_f16(&self.query, self.store.get(internal_id))
    }

    fn less_is_closer(&self) -> bool {
        self.metric.less_is_closer()
    }
}

impl StorageBackend for Float16Storage {
    fn kind(&self) -> ElementKind {
        ElementKind::Float16
    }

    fn dim(&self) -> usize {
        self.store.item_len()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn append(&mut self, vector: &[f32]) -> Result<usize, AnnError> {
        validate_dim(self.dim(), vector.len())?;
        let quantized: Vec<f16> = vector.iter().map(|&v| f16::from_f32(v)).collect();
        Ok(self.store.push(&quantized))
    }

    fn set(&mut self, internal_id: usize, vector: &[f32]) -> Result<(), AnnError> {
        validate_dim(self.dim(), vector.len())?;
        let quantized: Vec<f16> = vector.iter().map(|&v| f16::from_f32(v)).collect();
        self.store.set(internal_id, &quantized);
        Ok(())
    }

    fn reconstruct(&self, internal_id: usize) -> Vec<f32> {
        self.store.get(internal_id).iter().map(|v| v.to_f32()).collect()
    }

    fn adapt<'a>(&'a self, metric: Metric, query: &[f32]) -> Box<dyn AdaptedDistance + 'a> {
        let quantized: Vec<f16> = query.iter().map(|&v| f16::from_f32(v)).collect();
        Box::new(Float16Adapter {
            store: &self.store,
            query: quantized,
            metric,
        })
    }

    fn truncate(&mut self, new_len: usize) {
        self.store.truncate(new_len);
    }
}

/// Linear quantization against a fixed per-backend scale, following
/// `original_source`'s treatment of `i8` as a storage type already
/// quantized to a known range rather than one this crate auto-calibrates:
/// callers that want int8 storage are expected to have normalized their
/// vectors into `[-1, 1]` beforehand. `scale` converts between that range
/// and the `i8` domain.
#[derive(Serialize, Deserialize)]
pub struct Int8Storage {
    store: BlockedStore<i8>,
    scale: f32,
}

impl Int8Storage {
    pub fn new(dim: usize) -> Self {
        Int8Storage {
            store: BlockedStore::new(dim),
            scale: 127.0,
        }
    }

    fn quantize_one(&self, v: f32) -> i8 {
        (v * self.scale).round().clamp(-128.0, 127.0) as i8
    }

    fn quantize(&self, vector: &[f32]) -> Vec<i8> {
        vector.iter().map(|&v| self.quantize_one(v)).collect()
    }
}

struct Int8Adapter<'a> {
    store: &'a BlockedStore<i8>,
    query: Vec<i8>,
    metric: Metric,
}

impl AdaptedDistance for Int8Adapter<'_> {
    fn compute(&self, internal_id: usize) -> f32 {
        self.metric.distance_i8(&self.query, self.store.get(internal_id))
    }

    fn less_is_closer(&self) -> bool {
        self.metric.less_is_closer()
    }
}

impl StorageBackend for Int8Storage {
    fn kind(&self) -> ElementKind {
        ElementKind::Int8
    }

    fn dim(&self) -> usize {
        self.store.item_len()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn append(&mut self, vector: &[f32]) -> Result<usize, AnnError> {
        validate_dim(self.dim(), vector.len())?;
        let quantized = self.quantize(vector);
        Ok(self.store.push(&quantized))
    }

    fn set(&mut self, internal_id: usize, vector: &[f32]) -> Result<(), AnnError> {
        validate_dim(self.dim(), vector.len())?;
        let quantized = self.quantize(vector);
        self.store.set(internal_id, &quantized);
        Ok(())
    }

    fn reconstruct(&self, internal_id: usize) -> Vec<f32> {
        self.store
            .get(internal_id)
            .iter()
            .map(|&v| v as f32 / self.scale)
            .collect()
    }

    fn adapt<'a>(&'a self, metric: Metric, query: &[f32]) -> Box<dyn AdaptedDistance + 'a> {
        Box::new(Int8Adapter {
            store: &self.store,
            query: self.quantize(query),
            metric,
        })
    }

    fn truncate(&mut self, new_len: usize) {
        self.store.truncate(new_len);
    }
}

/// A tagged union over the three concrete backends, used wherever a backend
/// needs to be serialized: `Box<dyn StorageBackend>` cannot derive
/// `Serialize`/`Deserialize` on its own, but a plain enum over already-
/// `Serialize` variants can, so `save`/`load` go through this instead of
/// the trait object directly (`spec.md` §9's storage design note).
#[derive(Serialize, Deserialize)]
pub enum Storage {
    Float32(Float32Storage),
    Float16(Float16Storage),
    Int8(Int8Storage),
}

impl Storage {
    pub fn new(kind: ElementKind, dim: usize) -> Self {
        match kind {
            ElementKind::Float32 => Storage::Float32(Float32Storage::new(dim)),
            ElementKind::Float16 => Storage::Float16(Float16Storage::new(dim)),
            ElementKind::Int8 => Storage::Int8(Int8Storage::new(dim)),
        }
    }

    fn backend(&self) -> &dyn StorageBackend {
        match self {
            Storage::Float32(s) => s,
            Storage::Float16(s) => s,
            Storage::Int8(s) => s,
        }
    }

    fn backend_mut(&mut self) -> &mut dyn StorageBackend {
        match self {
            Storage::Float32(s) => s,
            Storage::Float16(s) => s,
            Storage::Int8(s) => s,
        }
    }
}

impl StorageBackend for Storage {
    fn kind(&self) -> ElementKind {
        self.backend().kind()
    }

    fn dim(&self) -> usize {
        self.backend().dim()
    }

    fn len(&self) -> usize {
        self.backend().len()
    }

    fn append(&mut self, vector: &[f32]) -> Result<usize, AnnError> {
        self.backend_mut().append(vector)
    }

    fn set(&mut self, internal_id: usize, vector: &[f32]) -> Result<(), AnnError> {
        self.backend_mut().set(internal_id, vector)
    }

    fn reconstruct(&self, internal_id: usize) -> Vec<f32> {
        self.backend().reconstruct(internal_id)
    }

    fn adapt<'a>(&'a self, metric: Metric, query: &[f32]) -> Box<dyn AdaptedDistance + 'a> {
        self.backend().adapt(metric, query)
    }

    fn truncate(&mut self, new_len: usize) {
        self.backend_mut().truncate(new_len)
    }
}

/// The families of compressed storage this workspace does not implement:
/// scalar quantization and the LVQ/LeanVec lines. Their on-disk layouts are
/// exactly the part the original design keeps opaque, so there is nothing to
/// port — this enum exists only so [`quantized_backend`] can name what it's
/// refusing to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizedKind {
    Scalar,
    Lvq,
    LeanVec,
}

/// A constructor stub for the quantized backend families. Every other
/// backend in this module is a real, working `StorageBackend`; this one
/// always fails, so a caller that asks for quantized storage gets a typed
/// error instead of silently falling back to full precision.
pub fn quantized_backend(kind: QuantizedKind) -> Result<Storage, AnnError> {
    Err(AnnError::not_implemented(format!(
        "quantized storage backend {kind:?} is not implemented in this workspace"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn float32_backend_self_distance_is_zero() {
        let mut backend = Float32Storage::new(3);
        let id = backend.append(&[1.0, 2.0, 3.0]).unwrap();
        let adapter = backend.adapt(Metric::L2, &[1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(adapter.compute(id), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn float16_backend_quantizes_and_reconstructs_approximately() {
        let mut backend = Float16Storage::new(2);
        let id = backend.append(&[0.5, -0.25]).unwrap();
        let reconstructed = backend.reconstruct(id);
        assert_abs_diff_eq!(reconstructed[0], 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(reconstructed[1], -0.25, epsilon = 1e-3);
    }

    #[test]
    fn int8_backend_round_trips_within_quantization_error() {
        let mut backend = Int8Storage::new(2);
        let id = backend.append(&[0.5, -0.5]).unwrap();
        let reconstructed = backend.reconstruct(id);
        assert_abs_diff_eq!(reconstructed[0], 0.5, epsilon = 0.02);
        assert_abs_diff_eq!(reconstructed[1], -0.5, epsilon = 0.02);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut backend = Float32Storage::new(3);
        assert!(backend.append(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn storage_enum_dispatches_to_the_right_variant() {
        let mut storage = Storage::new(ElementKind::Int8, 2);
        let id = storage.append(&[0.5, -0.5]).unwrap();
        assert_eq!(storage.kind(), ElementKind::Int8);
        let reconstructed = storage.reconstruct(id);
        assert_abs_diff_eq!(reconstructed[0], 0.5, epsilon = 0.02);
    }

    #[test]
    fn quantized_backend_is_not_implemented() {
        assert!(quantized_backend(QuantizedKind::Lvq).is_err());
    }
}
