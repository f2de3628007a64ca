// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The result sink range search writes into.
//!
//! Range search's result count is unbounded by a caller-supplied `k`, so
//! rather than returning a freshly allocated `Vec` from every call (wasteful
//! when a caller wants to merge many range queries into one running total,
//! e.g. IVF's per-cluster partial results), it takes a `&mut dyn RangeSink`
//! and pushes matches into it as they are found.

pub trait RangeSink {
    fn push(&mut self, external_id: u64, distance: f32);
}

/// The common case: collect everything into a `Vec`.
#[derive(Debug, Default)]
pub struct VecRangeSink {
    pub results: Vec<(u64, f32)>,
}

impl VecRangeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_results(self) -> Vec<(u64, f32)> {
        self.results
    }
}

impl RangeSink for VecRangeSink {
    fn push(&mut self, external_id: u64, distance: f32) {
        self.results.push((external_id, distance));
    }
}
