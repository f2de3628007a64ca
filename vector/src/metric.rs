// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.
use std::cmp::Ordering;

use half::f16;

use crate::kernels;

/// The two metrics the engine understands: squared L2 (smaller is closer)
/// and inner product (larger is closer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Metric {
    L2,
    InnerProduct,
}

impl Metric {
    /// `true` if a smaller raw score means "closer" under this metric.
    pub fn less_is_closer(self) -> bool {
        matches!(self, Metric::L2)
    }

    /// Order two raw scores from closest to farthest under this metric.
    pub fn compare(self, a: f32, b: f32) -> Ordering {
        if self.less_is_closer() {
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        } else {
            b.partial_cmp(&a).unwrap_or(Ordering::Equal)
        }
    }

    /// `true` if `candidate` is strictly closer than `incumbent`.
    pub fn is_closer(self, candidate: f32, incumbent: f32) -> bool {
        self.compare(candidate, incumbent) == Ordering::Less
    }

    pub fn distance_f32(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::L2 => kernels::l2_squared_f32(a, b),
            Metric::InnerProduct => kernels::inner_product_f32(a, b),
        }
    }

    pub fn distance_f16(self, a: &[f16], b: &[f16]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::L2 => kernels::l2_squared_f16(a, b),
            Metric::InnerProduct => kernels::inner_product_f16(a, b),
        }
    }

    pub fn distance_i8(self, a: &[i8], b: &[i8]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Metric::L2 => kernels::l2_squared_i8(a, b),
            Metric::InnerProduct => kernels::inner_product_i8(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_prefers_smaller() {
        assert!(Metric::L2.is_closer(1.0, 2.0));
        assert!(!Metric::L2.is_closer(2.0, 1.0));
    }

    #[test]
    fn inner_product_prefers_larger() {
        assert!(Metric::InnerProduct.is_closer(2.0, 1.0));
        assert!(!Metric::InnerProduct.is_closer(1.0, 2.0));
    }
}
