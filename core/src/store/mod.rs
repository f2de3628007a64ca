// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Storage: the block-allocated dense array, the per-element-type concrete
//! backends built on top of it, and the distance-adapter contract that lets
//! search code stay agnostic to which backend it is searching.

pub mod backend;
pub mod blocked;
pub mod distance_adapter;

pub use backend::{ElementKind, Float16Storage, Float32Storage, Int8Storage, QuantizedKind, Storage, StorageBackend, quantized_backend};
pub use blocked::BlockedStore;
pub use distance_adapter::AdaptedDistance;
