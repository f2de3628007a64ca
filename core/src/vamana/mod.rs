// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The dynamic Vamana proximity-graph index, plus a static read-only
//! wrapper for callers that build once and never mutate afterward.

pub mod config;
pub mod index;
pub mod pruner;

pub use config::{
    effective_search_window_size, VamanaBuildParameters, VamanaBuildParametersBuilder,
    VamanaSearchParameters, VamanaSearchParametersBuilder,
};
pub use index::DynamicVamanaIndex;

use std::io;

use vector::Metric;

use crate::common::error::AnnError;
use crate::common::filter::IdFilter;
use crate::common::range_sink::RangeSink;
use crate::store::backend::ElementKind;

/// A build-once, query-many Vamana index. `spec.md` §9's Open Question on
/// static vs. dynamic index variants is resolved here: rather than
/// duplicating the graph/search algorithm, the static index is a thin
/// wrapper restricting [`DynamicVamanaIndex`] to `build`/`search`/
/// `range_search`/`save`/`load` — the underlying structure is identical,
/// only the exposed surface differs.
pub struct VamanaIndex {
    inner: DynamicVamanaIndex,
}

impl VamanaIndex {
    pub fn build(
        vectors: &[Vec<f32>],
        external_ids: &[u64],
        metric: Metric,
        element_kind: ElementKind,
        build_params: VamanaBuildParameters,
    ) -> Result<Self, AnnError> {
        Ok(VamanaIndex {
            inner: DynamicVamanaIndex::build(vectors, external_ids, metric, element_kind, build_params)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn has_id(&self, external_id: u64) -> bool {
        self.inner.has_id(external_id)
    }

    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        params: VamanaSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<(u64, f32)>, AnnError> {
        self.inner.search(query, k, params, filter)
    }

    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        sink: &mut dyn RangeSink,
        params: VamanaSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<(), AnnError> {
        self.inner.range_search(query, radius, sink, params, filter)
    }

    pub fn save(&self, writer: impl io::Write) -> Result<(), AnnError> {
        self.inner.save(writer)
    }

    pub fn load(reader: impl io::Read) -> Result<Self, AnnError> {
        Ok(VamanaIndex {
            inner: DynamicVamanaIndex::load(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_wrapper_exposes_only_read_operations() {
        let vectors = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let ids = vec![1, 2, 3];
        let params = VamanaBuildParametersBuilder::new().max_degree(4).build(Metric::L2).unwrap();
        let index = VamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, params).unwrap();
        assert_eq!(index.len(), 3);
        let results = index.search(&[0.1, 0.0], 1, VamanaSearchParameters::default(), None).unwrap();
        assert_eq!(results[0].0, 1);
    }
}
