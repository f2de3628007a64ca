// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Scalar distance kernels.
//!
//! Accumulation always happens in `f32` (or wider) regardless of the
//! element type, matching `original_source`'s treatment of low-precision
//! accumulators in `svs/core/distance/euclidean.h`: an `i8` dot product is
//! accumulated in `i32` and only converted to `f32` at the end, so that the
//! recall-parity acceptance bound in the distance-kernel contract holds even
//! for the narrowest element type this workspace stores.

use half::f16;

#[inline]
pub fn l2_squared_f32(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[inline]
pub fn inner_product_f32(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
pub fn l2_squared_f16(a: &[f16], b: &[f16]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x.to_f32() - y.to_f32();
            diff * diff
        })
        .sum()
}

#[inline]
pub fn inner_product_f16(a: &[f16], b: &[f16]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
}

#[inline]
pub fn l2_squared_i8(a: &[i8], b: &[i8]) -> f32 {
    let sum: i32 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let diff = x as i32 - y as i32;
            diff * diff
        })
        .sum();
    sum as f32
}

#[inline]
pub fn inner_product_i8(a: &[i8], b: &[i8]) -> f32 {
    let sum: i32 = a.iter().zip(b).map(|(&x, &y)| x as i32 * y as i32).sum();
    sum as f32
}
