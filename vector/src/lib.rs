// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Distance kernels and element-type primitives shared by every storage
//! backend and index in this workspace.
//!
//! Kernels are intentionally scalar. SIMD dispatch (AVX2/AVX-512/NEON
//! selection by CPU microarchitecture) is out of scope here: a production
//! deployment of this crate would replace [`kernels::l2_squared_f32`] and
//! friends with a dispatch table keyed on `is_x86_feature_detected!`, but
//! the mathematical contract — not the instruction selection — is what this
//! crate specifies.

mod kernels;
mod metric;
mod utils;

pub use kernels::{
    inner_product_f16, inner_product_f32, inner_product_i8, l2_squared_f16, l2_squared_f32,
    l2_squared_i8,
};
pub use metric::Metric;
pub use utils::prefetch_vector;
