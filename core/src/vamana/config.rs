// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Build- and search-time parameter structs for the Vamana index, following
//! the teacher's `IndexWriteParametersBuilder` convention: a plain data
//! struct plus a builder that validates once at `build()` time rather than
//! on every field setter.

use serde::{Deserialize, Serialize};
use vector::Metric;

use crate::common::error::AnnError;

/// `0` in any `u32`/`usize` field below requests the engine default noted
/// on that field, matching `spec.md` §6's "a zero field requests the
/// engine default" convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VamanaBuildParameters {
    pub max_degree: usize,
    /// Alpha pruning threshold. Default 1.2 for L2, 0.95 for inner product
    /// when left at `0.0`.
    pub alpha: f32,
    /// Candidate list size used while inserting each vertex. Defaults to
    /// `2 * max_degree` when `0`.
    pub build_search_window_size: usize,
    /// Neighbor count kept per vertex after pruning. Defaults to
    /// `max_degree - 4` (never below 1) when `0`.
    pub prune_to: usize,
    /// `0` requests the engine's ambient worker pool thread count.
    pub num_threads: usize,
}

impl Default for VamanaBuildParameters {
    fn default() -> Self {
        VamanaBuildParameters {
            max_degree: 64,
            alpha: 0.0,
            build_search_window_size: 0,
            prune_to: 0,
            num_threads: 0,
        }
    }
}

pub struct VamanaBuildParametersBuilder {
    params: VamanaBuildParameters,
}

impl VamanaBuildParametersBuilder {
    pub fn new() -> Self {
        VamanaBuildParametersBuilder {
            params: VamanaBuildParameters::default(),
        }
    }

    pub fn max_degree(mut self, max_degree: usize) -> Self {
        self.params.max_degree = max_degree;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.params.alpha = alpha;
        self
    }

    pub fn build_search_window_size(mut self, size: usize) -> Self {
        self.params.build_search_window_size = size;
        self
    }

    pub fn prune_to(mut self, prune_to: usize) -> Self {
        self.params.prune_to = prune_to;
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.params.num_threads = num_threads;
        self
    }

    /// Fills in defaults for every `0` field and validates the result,
    /// matching `spec.md` §6: `prune_to <= max_degree`, `alpha` (once
    /// defaulted) within a metric-dependent range. `spec.md` §4.7 states
    /// `alpha ∈ [1.0, 2.0]` but also names a ~0.95 inner-product default,
    /// which falls outside that interval — `original_source` (`dynamic_index.h`)
    /// does not fix a bound at all, so the valid range is branched on
    /// polarity here: `[1.0, 2.0]` for L2 (matches the spec's stated range
    /// exactly) and `[0.5, 1.0]` for inner product (symmetric around its
    /// 0.95 default, since occlusion pruning still needs `alpha <= 1.0` to
    /// be meaningful under a "larger is closer" comparator).
    pub fn build(self, metric: Metric) -> Result<VamanaBuildParameters, AnnError> {
        let mut params = self.params;
        if params.max_degree == 0 {
            return Err(AnnError::invalid_argument("max_degree must be nonzero"));
        }
        if params.alpha == 0.0 {
            params.alpha = if metric.less_is_closer() { 1.2 } else { 0.95 };
        }
        let valid_range = if metric.less_is_closer() { 1.0..=2.0 } else { 0.5..=1.0 };
        if !valid_range.contains(&params.alpha) {
            return Err(AnnError::invalid_argument(format!(
                "alpha must be in [{}, {}] for this metric, got {}",
                valid_range.start(),
                valid_range.end(),
                params.alpha
            )));
        }
        if params.build_search_window_size == 0 {
            params.build_search_window_size = params.max_degree * 2;
        }
        if params.prune_to == 0 {
            params.prune_to = params.max_degree.saturating_sub(4).max(1);
        }
        if params.prune_to > params.max_degree {
            return Err(AnnError::invalid_argument(
                "prune_to must not exceed max_degree",
            ));
        }
        Ok(params)
    }
}

impl Default for VamanaBuildParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct VamanaSearchParameters {
    /// Candidate list size ("L") used during search. Defaults to
    /// `max(100, 2 * k)` when `0`, resolved at search time since it depends
    /// on `k`.
    pub search_window_size: usize,
    /// How many upcoming neighbors to prefetch while expanding a vertex,
    /// matching the teacher's `windows(2)` prefetch stride. `0` disables
    /// prefetch hinting.
    pub prefetch_lookahead: usize,
    pub prefetch_step: usize,
    /// `0` requests the ambient worker pool thread count.
    pub num_threads: usize,
}

impl Default for VamanaSearchParameters {
    fn default() -> Self {
        VamanaSearchParameters {
            search_window_size: 0,
            prefetch_lookahead: 2,
            prefetch_step: 1,
            num_threads: 0,
        }
    }
}

pub struct VamanaSearchParametersBuilder {
    params: VamanaSearchParameters,
}

impl VamanaSearchParametersBuilder {
    pub fn new() -> Self {
        VamanaSearchParametersBuilder {
            params: VamanaSearchParameters::default(),
        }
    }

    pub fn search_window_size(mut self, size: usize) -> Self {
        self.params.search_window_size = size;
        self
    }

    pub fn prefetch_lookahead(mut self, lookahead: usize) -> Self {
        self.params.prefetch_lookahead = lookahead;
        self
    }

    pub fn prefetch_step(mut self, step: usize) -> Self {
        self.params.prefetch_step = step;
        self
    }

    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.params.num_threads = num_threads;
        self
    }

    pub fn build(self) -> VamanaSearchParameters {
        self.params
    }
}

impl Default for VamanaSearchParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the effective search-list capacity for a query asking for `k`
/// results, applying the `0 = default` rule.
pub fn effective_search_window_size(params: &VamanaSearchParameters, k: usize) -> usize {
    if params.search_window_size == 0 {
        (2 * k).max(100)
    } else {
        params.search_window_size.max(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_params_default_alpha_depends_on_metric() {
        let l2 = VamanaBuildParametersBuilder::new()
            .max_degree(32)
            .build(Metric::L2)
            .unwrap();
        assert_eq!(l2.alpha, 1.2);
        let ip = VamanaBuildParametersBuilder::new()
            .max_degree(32)
            .build(Metric::InnerProduct)
            .unwrap();
        assert_eq!(ip.alpha, 0.95);
    }

    #[test]
    fn build_params_default_prune_to_is_max_degree_minus_four() {
        let params = VamanaBuildParametersBuilder::new()
            .max_degree(32)
            .build(Metric::L2)
            .unwrap();
        assert_eq!(params.prune_to, 28);
    }

    #[test]
    fn build_params_rejects_prune_to_over_max_degree() {
        let err = VamanaBuildParametersBuilder::new()
            .max_degree(10)
            .prune_to(20)
            .build(Metric::L2);
        assert!(err.is_err());
    }

    #[test]
    fn build_params_rejects_alpha_out_of_range() {
        let err = VamanaBuildParametersBuilder::new()
            .max_degree(10)
            .alpha(5.0)
            .build(Metric::L2);
        assert!(err.is_err());
    }

    #[test]
    fn effective_search_window_size_defaults_from_k() {
        let params = VamanaSearchParametersBuilder::new().build();
        assert_eq!(effective_search_window_size(&params, 10), 100);
        assert_eq!(effective_search_window_size(&params, 80), 160);
    }
}
