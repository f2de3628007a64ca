// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The dynamic IVF (inverted-file) index, plus a static read-only wrapper
//! for callers that build once and never mutate afterward.

pub mod cluster;
pub mod config;
pub mod index;
pub mod kmeans;

pub use config::{IvfBuildParameters, IvfBuildParametersBuilder, IvfSearchParameters, IvfSearchParametersBuilder};
pub use index::DynamicIvfIndex;

use std::io;

use vector::Metric;

use crate::common::error::AnnError;
use crate::common::filter::IdFilter;
use crate::common::range_sink::RangeSink;

/// A build-once, query-many IVF index. Mirrors [`crate::vamana::VamanaIndex`]:
/// a thin wrapper restricting [`DynamicIvfIndex`] to `build`/`search`/
/// `range_search`/`save`/`load`, with no separate algorithm of its own.
pub struct IvfIndex {
    inner: DynamicIvfIndex,
}

impl IvfIndex {
    pub fn build(
        vectors: &[Vec<f32>],
        external_ids: &[u64],
        metric: Metric,
        build_params: IvfBuildParameters,
    ) -> Result<Self, AnnError> {
        Ok(IvfIndex {
            inner: DynamicIvfIndex::build(vectors, external_ids, metric, build_params)?,
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
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<(u64, f32)>, AnnError> {
        self.inner.search(query, k, params, filter)
    }

    pub fn search_batch(
        &self,
        queries: &[Vec<f32>],
        k: usize,
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<Vec<Vec<(u64, f32)>>, AnnError> {
        self.inner.search_batch(queries, k, params, filter)
    }

    pub fn range_search(
        &self,
        query: &[f32],
        radius: f32,
        sink: &mut dyn RangeSink,
        params: IvfSearchParameters,
        filter: Option<&dyn IdFilter>,
    ) -> Result<(), AnnError> {
        self.inner.range_search(query, radius, sink, params, filter)
    }

    pub fn save(&self, writer: impl io::Write) -> Result<(), AnnError> {
        self.inner.save(writer)
    }

    pub fn load(reader: impl io::Read) -> Result<Self, AnnError> {
        Ok(IvfIndex {
            inner: DynamicIvfIndex::load(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ivf::config::IvfBuildParametersBuilder;

    #[test]
    fn static_wrapper_exposes_only_read_operations() {
        let vectors: Vec<Vec<f32>> = (0..20).map(|i| vec![i as f32, 0.0]).collect();
        let ids: Vec<u64> = (0..20).map(|i| i as u64).collect();
        let params = IvfBuildParametersBuilder::new().n_clusters(2).build(vectors.len()).unwrap();
        let index = IvfIndex::build(&vectors, &ids, Metric::L2, params).unwrap();
        assert_eq!(index.len(), 20);
        let results = index.search(&[10.1, 0.0], 1, IvfSearchParameters::default(), None).unwrap();
        assert_eq!(results[0].0, 10);
    }
}
