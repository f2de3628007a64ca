// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! K-means centroid training: flat Lloyd's-algorithm k-means, and a
//! two-level hierarchical variant for large cluster counts.
//!
//! Not present in the retrieved teacher pack (`diskann-rs` has no IVF
//! component); grounded in `original_source`'s `dynamic_ivf.h` description
//! of training a coarse quantizer, implemented here as ordinary Lloyd
//! iteration over `f32` centroids with `rand`-seeded k-means++-style
//! initialization, matching this workspace's established "seeded `StdRng`
//! for determinism-sensitive paths" convention (`spec.md` §8).

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use vector::Metric;

/// Runs `n_redo` independent k-means restarts of up to `max_iterations`
/// Lloyd iterations each, keeping the lowest-inertia (sum of squared
/// distances to assigned centroid) result.
pub fn train_flat(
    vectors: &[Vec<f32>],
    k: usize,
    metric: Metric,
    max_iterations: usize,
    n_redo: usize,
    seed: u64,
) -> Vec<Vec<f32>> {
    let mut best: Option<(f32, Vec<Vec<f32>>)> = None;
    for restart in 0..n_redo.max(1) {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(restart as u64));
        let (centroids, inertia) = run_lloyd(vectors, k, metric, max_iterations, &mut rng);
        if best.as_ref().map(|(best_inertia, _)| inertia < *best_inertia).unwrap_or(true) {
            best = Some((inertia, centroids));
        }
    }
    best.map(|(_, centroids)| centroids).unwrap_or_default()
}

/// Two-level training: clusters `vectors` into `sqrt(k)`-ish coarse groups,
/// then trains `k / n_coarse` fine centroids independently within each
/// coarse group's member vectors, concatenating the result. Used above
/// `hierarchical_threshold` target clusters, where flat k-means's per-
/// iteration all-pairs assignment cost against every centroid becomes the
/// bottleneck.
pub fn train_hierarchical(
    vectors: &[Vec<f32>],
    k: usize,
    metric: Metric,
    max_iterations: usize,
    n_redo: usize,
    seed: u64,
) -> Vec<Vec<f32>> {
    let n_coarse = (k as f64).sqrt().ceil().max(1.0) as usize;
    let n_coarse = n_coarse.min(vectors.len()).max(1);
    let coarse_centroids = train_flat(vectors, n_coarse, metric, max_iterations, n_redo, seed);

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); coarse_centroids.len()];
    for (i, v) in vectors.iter().enumerate() {
        let nearest = nearest_centroid(v, &coarse_centroids, metric);
        groups[nearest].push(i);
    }

    let fine_per_group = (k / coarse_centroids.len().max(1)).max(1);
    let mut centroids = Vec::with_capacity(k);
    for (group_idx, members) in groups.iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let group_vectors: Vec<Vec<f32>> = members.iter().map(|&i| vectors[i].clone()).collect();
        let fine_k = fine_per_group.min(group_vectors.len());
        let fine = train_flat(
            &group_vectors,
            fine_k,
            metric,
            max_iterations,
            n_redo,
            seed.wrapping_add(group_idx as u64 * 1000 + 7),
        );
        centroids.extend(fine);
    }
    if centroids.is_empty() {
        centroids = coarse_centroids;
    }
    centroids
}

fn run_lloyd(
    vectors: &[Vec<f32>],
    k: usize,
    metric: Metric,
    max_iterations: usize,
    rng: &mut StdRng,
) -> (Vec<Vec<f32>>, f32) {
    let k = k.min(vectors.len()).max(1);
    let dim = vectors[0].len();
    let mut centroids = random_init(vectors, k, rng);
    let mut assignments = vec![0usize; vectors.len()];

    for _ in 0..max_iterations.max(1) {
        let mut changed = false;
        for (i, v) in vectors.iter().enumerate() {
            let nearest = nearest_centroid(v, &centroids, metric);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0f32; dim]; k];
        let mut counts = vec![0usize; k];
        for (i, v) in vectors.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            for (s, &x) in sums[c].iter_mut().zip(v.iter()) {
                *s += x;
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            for s in sums[c].iter_mut() {
                *s /= counts[c] as f32;
            }
            centroids[c] = sums[c].clone();
        }

        if !changed {
            break;
        }
    }

    let inertia: f32 = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| metric.distance_f32(v, &centroids[assignments[i]]))
        .sum();
    (centroids, inertia)
}

fn random_init(vectors: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut indices: Vec<usize> = (0..vectors.len()).collect();
    for i in (1..indices.len()).rev() {
        let j = rng.random_range(0..=i);
        indices.swap(i, j);
    }
    indices.into_iter().take(k).map(|i| vectors[i].clone()).collect()
}

pub fn nearest_centroid(query: &[f32], centroids: &[Vec<f32>], metric: Metric) -> usize {
    centroids
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| metric.compare(metric.distance_f32(query, a), metric.distance_f32(query, b)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
