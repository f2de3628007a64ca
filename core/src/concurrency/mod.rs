// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! A small worker-pool abstraction shared by the Vamana and IVF indices.
//!
//! The teacher (`diskann-rs`) calls `rayon::ThreadPoolBuilder`/
//! `set_rayon_num_threads` directly at each build/insert/delete call site.
//! This crate needs the same partitioned-parallel-closure shape from two
//! independent index families plus IVF's nested inter-query/intra-query
//! split, so it is pulled out into one reusable [`WorkerPool`] instead of
//! repeating the builder calls: `static_for_each` divides `0..len` into
//! `current_num_threads()` contiguous ranges up front (the "static
//! partition" of `spec.md` §5), `dynamic_for_each` instead has workers pull
//! fixed-size chunks from a shared atomic cursor until the range is
//! exhausted (the "dynamic partition"). Both collect the first error from a
//! fallible per-item closure and abandon the rest, matching the teacher's
//! `execute_with_rayon` convention generalized to propagate rather than
//! `.unwrap()`.
//!
//! The pool handle itself lives behind a `RwLock` favoring readers: pool
//! swaps (`set_threads`) are rare, every search/insert/build call just reads
//! the current `Arc<ThreadPool>` once and runs on it, so concurrent
//! operations never contend with each other over the pool reference itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::common::error::AnnError;
use crate::utils::rayon_util::static_partitions;

pub struct WorkerPool {
    inner: RwLock<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// `num_threads == 0` requests rayon's own default (generally the
    /// number of logical CPUs).
    pub fn new(num_threads: usize) -> Result<Self, AnnError> {
        Ok(WorkerPool {
            inner: RwLock::new(Arc::new(build_pool(num_threads)?)),
        })
    }

    pub fn shared(num_threads: usize) -> Result<Arc<Self>, AnnError> {
        Ok(Arc::new(Self::new(num_threads)?))
    }

    /// Swaps the active thread pool. Any operation already holding a
    /// reference to the old pool runs to completion on it; only later
    /// calls observe the new one.
    pub fn set_threads(&self, num_threads: usize) -> Result<(), AnnError> {
        let pool = build_pool(num_threads)?;
        let mut guard = self
            .inner
            .write()
            .map_err(|_| AnnError::lock_poisoned("worker pool"))?;
        *guard = Arc::new(pool);
        Ok(())
    }

    pub fn num_threads(&self) -> usize {
        self.current().current_num_threads()
    }

    fn current(&self) -> Arc<ThreadPool> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Splits `0..len` into `current_num_threads()` contiguous ranges once
    /// and runs each range's items on the pool. Use when items cost roughly
    /// the same amount of work (e.g. one insertion per new vertex).
    pub fn static_for_each<F>(&self, len: usize, f: F) -> Result<(), AnnError>
    where
        F: Fn(usize) -> Result<(), AnnError> + Sync,
    {
        if len == 0 {
            return Ok(());
        }
        let pool = self.current();
        let partitions = static_partitions(len, pool.current_num_threads().max(1));
        pool.install(|| {
            partitions
                .into_par_iter()
                .try_for_each(|(start, end)| {
                    for i in start..end {
                        f(i).map_err(|e| (i, e))?;
                    }
                    Ok(())
                })
                .map_err(|(_, e): (usize, AnnError)| e)
        })
    }

    /// Workers pull `chunk_size`-sized chunks of `0..len` from a shared
    /// cursor until exhausted, rather than a fixed up-front split. Use when
    /// per-item cost is uneven (e.g. IVF cluster scans of differing size).
    pub fn dynamic_for_each<F>(&self, len: usize, chunk_size: usize, f: F) -> Result<(), AnnError>
    where
        F: Fn(usize) -> Result<(), AnnError> + Sync,
    {
        if len == 0 {
            return Ok(());
        }
        let pool = self.current();
        let chunk_size = chunk_size.max(1);
        let cursor = AtomicUsize::new(0);
        let workers = pool.current_num_threads().max(1);
        pool.install(|| {
            (0..workers)
                .into_par_iter()
                .try_for_each(|_| -> Result<(), AnnError> {
                    loop {
                        let start = cursor.fetch_add(chunk_size, Ordering::Relaxed);
                        if start >= len {
                            return Ok(());
                        }
                        let end = (start + chunk_size).min(len);
                        for i in start..end {
                            f(i)?;
                        }
                    }
                })
        })
    }

    /// Runs two nested partitioned loops honoring `outer * inner <=
    /// num_threads()`, matching the IVF search pipeline's
    /// inter-query/intra-query split (`spec.md` §4.10). `outer_len` items
    /// (queries) are statically partitioned across an outer pool; for each
    /// one, `inner(outer_index)` receives an inner [`WorkerPool`]-shaped
    /// budget it can further subdivide across probed clusters.
    pub fn nested_for_each<F>(&self, outer_len: usize, inner_width: usize, f: F) -> Result<(), AnnError>
    where
        F: Fn(usize, usize) -> Result<(), AnnError> + Sync,
    {
        if outer_len == 0 {
            return Ok(());
        }
        let total = self.num_threads().max(1);
        let outer_width = (total / inner_width.max(1)).max(1);
        let pool = self.current();
        let partitions = static_partitions(outer_len, outer_width);
        pool.install(|| {
            partitions
                .into_par_iter()
                .try_for_each(|(start, end)| {
                    for i in start..end {
                        f(i, inner_width).map_err(|e| (i, e))?;
                    }
                    Ok(())
                })
                .map_err(|(_, e): (usize, AnnError)| e)
        })
    }
}

fn build_pool(num_threads: usize) -> Result<ThreadPool, AnnError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| AnnError::runtime(format!("failed to build thread pool: {e}")))
}
