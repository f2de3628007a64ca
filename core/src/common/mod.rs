// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

pub mod error;
pub mod filter;
pub mod range_sink;
pub mod status;

pub use error::{AnnError, AnnResult};
pub use filter::IdFilter;
pub use range_sink::{RangeSink, VecRangeSink};
pub use status::SlotStatus;
