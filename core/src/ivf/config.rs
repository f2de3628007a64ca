// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Build- and search-time parameter structs for the IVF index, following
//! the same builder convention as [`crate::vamana::config`].

use serde::{Deserialize, Serialize};

use crate::common::error::AnnError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IvfBuildParameters {
    pub n_clusters: usize,
    /// K-means iterations. `0` defaults to 25.
    pub kmeans_max_iterations: usize,
    /// Independent k-means restarts, keeping the lowest-inertia result.
    /// `0` defaults to 3.
    pub kmeans_n_redo: usize,
    /// Above this many target clusters, training uses two-level
    /// hierarchical k-means (coarse, then fine within each coarse group)
    /// instead of flat k-means, matching `dynamic_ivf.h`'s large-`n_clusters`
    /// path. `0` defaults to 4096.
    pub hierarchical_threshold: usize,
    pub seed: u64,
    /// `0` requests the ambient worker pool thread count.
    pub num_threads: usize,
}

impl Default for IvfBuildParameters {
    fn default() -> Self {
        IvfBuildParameters {
            n_clusters: 0,
            kmeans_max_iterations: 0,
            kmeans_n_redo: 0,
            hierarchical_threshold: 0,
            seed: 42,
            num_threads: 0,
        }
    }
}

pub struct IvfBuildParametersBuilder {
    params: IvfBuildParameters,
}

impl IvfBuildParametersBuilder {
    pub fn new() -> Self {
        IvfBuildParametersBuilder {
            params: IvfBuildParameters::default(),
        }
    }

    pub fn n_clusters(mut self, n_clusters: usize) -> Self {
        self.params.n_clusters = n_clusters;
        self
    }

    pub fn kmeans_max_iterations(mut self, iterations: usize) -> Self {
        self.params.kmeans_max_iterations = iterations;
        self
    }

    pub fn kmeans_n_redo(mut self, redo: usize) -> Self {
        self.params.kmeans_n_redo = redo;
        self
    }

    pub fn hierarchical_threshold(mut self, threshold: usize) -> Self {
        self.params.hierarchical_threshold = threshold;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.params.num_threads = num_threads;
        self
    }

    pub fn build(self, n_vectors: usize) -> Result<IvfBuildParameters, AnnError> {
        let mut params = self.params;
        if params.n_clusters == 0 {
            return Err(AnnError::invalid_argument("n_clusters must be nonzero"));
        }
        if params.n_clusters > n_vectors {
            return Err(AnnError::invalid_argument(
                "n_clusters must not exceed the number of vectors being indexed",
            ));
        }
        if params.kmeans_max_iterations == 0 {
            params.kmeans_max_iterations = 25;
        }
        if params.kmeans_n_redo == 0 {
            params.kmeans_n_redo = 3;
        }
        if params.hierarchical_threshold == 0 {
            params.hierarchical_threshold = 4096;
        }
        Ok(params)
    }
}

impl Default for IvfBuildParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IvfSearchParameters {
    /// How many nearest clusters to scan per query. `0` defaults to 8.
    pub n_probes: usize,
    /// Overshoot factor: each probed cluster contributes up to
    /// `k_reorder * k` candidates before the global top-`k` trim, matching
    /// `dynamic_ivf.h`'s overshoot-then-trim reordering step. `0` defaults
    /// to 2.
    pub k_reorder: usize,
    /// Outer (inter-query) parallelism width. `0` defaults to the pool's
    /// full thread count.
    pub num_threads_outer: usize,
    /// Inner (intra-query, per-cluster) parallelism width. `0` defaults to 1.
    pub num_threads_inner: usize,
}

impl Default for IvfSearchParameters {
    fn default() -> Self {
        IvfSearchParameters {
            n_probes: 0,
            k_reorder: 0,
            num_threads_outer: 0,
            num_threads_inner: 0,
        }
    }
}

pub struct IvfSearchParametersBuilder {
    params: IvfSearchParameters,
}

impl IvfSearchParametersBuilder {
    pub fn new() -> Self {
        IvfSearchParametersBuilder {
            params: IvfSearchParameters::default(),
        }
    }

    pub fn n_probes(mut self, n_probes: usize) -> Self {
        self.params.n_probes = n_probes;
        self
    }

    pub fn k_reorder(mut self, k_reorder: usize) -> Self {
        self.params.k_reorder = k_reorder;
        self
    }

    pub fn num_threads_outer(mut self, n: usize) -> Self {
        self.params.num_threads_outer = n;
        self
    }

    pub fn num_threads_inner(mut self, n: usize) -> Self {
        self.params.num_threads_inner = n;
        self
    }

    pub fn build(self) -> IvfSearchParameters {
        let mut params = self.params;
        if params.n_probes == 0 {
            params.n_probes = 8;
        }
        if params.k_reorder == 0 {
            params.k_reorder = 2;
        }
        if params.num_threads_inner == 0 {
            params.num_threads_inner = 1;
        }
        params
    }
}

impl Default for IvfSearchParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_params_rejects_more_clusters_than_vectors() {
        let err = IvfBuildParametersBuilder::new().n_clusters(100).build(10);
        assert!(err.is_err());
    }

    #[test]
    fn build_params_fills_in_defaults() {
        let params = IvfBuildParametersBuilder::new().n_clusters(4).build(100).unwrap();
        assert_eq!(params.kmeans_max_iterations, 25);
        assert_eq!(params.kmeans_n_redo, 3);
    }

    #[test]
    fn search_params_default_fills_probes_and_reorder() {
        let params = IvfSearchParametersBuilder::new().build();
        assert_eq!(params.n_probes, 8);
        assert_eq!(params.k_reorder, 2);
    }
}
