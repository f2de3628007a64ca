// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

/// A predicate over external ids, used to restrict search to a subset of the
/// index without materializing a separate filtered copy.
///
/// Implemented for any `Fn(u64) -> bool + Send + Sync`, so callers can pass
/// a closure, a `HashSet<u64>` membership check, or a bitmap lookup. Search
/// calls this once per candidate it considers, not once per stored vector:
/// a selective filter does not make search cheaper, since non-matching
/// candidates still consume a graph hop or a cluster slot.
pub trait IdFilter: Send + Sync {
    fn allows(&self, external_id: u64) -> bool;
}

impl<F> IdFilter for F
where
    F: Fn(u64) -> bool + Send + Sync,
{
    fn allows(&self, external_id: u64) -> bool {
        self(external_id)
    }
}

/// The filter that allows everything, used when a caller passes no filter.
pub struct NoFilter;

impl IdFilter for NoFilter {
    fn allows(&self, _external_id: u64) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn closure_filter_works() {
        let f = |id: u64| id % 2 == 0;
        assert!(f.allows(4));
        assert!(!f.allows(5));
    }

    #[test]
    fn hashset_filter_works() {
        let allowed: HashSet<u64> = [1, 2, 3].into_iter().collect();
        let f = move |id: u64| allowed.contains(&id);
        assert!(f.allows(2));
        assert!(!f.allows(7));
    }

    #[test]
    fn no_filter_allows_everything() {
        assert!(NoFilter.allows(0));
        assert!(NoFilter.allows(u64::MAX));
    }
}
