// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! The bounded best-k search buffer and greedy beam search traversal shared
//! by both index families' insertion and query paths.

pub mod beam;
pub mod buffer;

pub use beam::{greedy_search, BeamSearchResult};
pub use buffer::{is_better, Candidate, SearchBuffer};
