// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! Range partitioning shared by [`crate::concurrency::WorkerPool`]'s static
//! partitioning mode.

/// Splits `0..len` into `chunk_count` contiguous ranges (the last absorbing
/// any remainder) and returns them as `(start, end)` pairs. Used by static
/// partitioning call sites that want to size batches themselves rather than
/// rely on rayon's work-stealing granularity, matching how the teacher's
/// build path chunks insertion batches ahead of a `par_iter`.
pub fn static_partitions(len: usize, chunk_count: usize) -> Vec<(usize, usize)> {
    if len == 0 || chunk_count == 0 {
        return Vec::new();
    }
    let chunk_count = chunk_count.min(len);
    let base = len / chunk_count;
    let remainder = len % chunk_count;
    let mut partitions = Vec::with_capacity(chunk_count);
    let mut start = 0;
    for i in 0..chunk_count {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        partitions.push((start, end));
        start = end;
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_partitions_cover_the_range_without_gaps() {
        let partitions = static_partitions(17, 4);
        assert_eq!(partitions.first().unwrap().0, 0);
        assert_eq!(partitions.last().unwrap().1, 17);
        for window in partitions.windows(2) {
            assert_eq!(window[0].1, window[1].0);
        }
    }

    #[test]
    fn static_partitions_handles_more_chunks_than_items() {
        let partitions = static_partitions(2, 8);
        assert_eq!(partitions.len(), 2);
    }
}
