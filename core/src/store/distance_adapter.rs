// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The per-query distance adapter contract.
//!
//! A search touches the same query against many candidates. `fix_argument`
//! runs once per query (quantizing it to the backend's element type,
//! precomputing a norm, whatever the backend needs), and `compute` runs
//! once per candidate against that fixed argument — avoiding repeating the
//! per-query setup work on every single comparison. This mirrors the
//! distance-adaptor split in `original_source`'s `svs/core/distance`
//! headers (`fix_argument` then `compute`), generalized here to a trait
//! object so a search loop can stay agnostic to which element type backs
//! the index it's searching.

/// A query fixed against one storage backend, ready to be compared against
/// any internal id in that backend.
pub trait AdaptedDistance {
    /// Raw distance between the fixed query and the vector at `internal_id`.
    /// Comparator polarity (smaller-is-closer vs larger-is-closer) is
    /// exposed separately via [`AdaptedDistance::less_is_closer`] rather
    /// than folded into the sign of this value, so callers can still
    /// inspect the true metric score (e.g. to report it to a caller).
    fn compute(&self, internal_id: usize) -> f32;

    /// `true` if a smaller score from [`compute`](AdaptedDistance::compute)
    /// means "closer".
    fn less_is_closer(&self) -> bool;

    fn is_closer(&self, candidate: f32, incumbent: f32) -> bool {
        if self.less_is_closer() {
            candidate < incumbent
        } else {
            candidate > incumbent
        }
    }
}
