// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//! End-to-end scenarios against literal corpora and seeds, exercising the
//! public API the way a caller would rather than one module at a time.

use annidx::common::range_sink::VecRangeSink;
use annidx::flat::{recall_at_k, FlatIndex};
use annidx::ivf::config::{IvfBuildParametersBuilder, IvfSearchParametersBuilder};
use annidx::ivf::DynamicIvfIndex;
use annidx::store::backend::ElementKind;
use annidx::vamana::config::{VamanaBuildParametersBuilder, VamanaSearchParameters};
use annidx::vamana::DynamicVamanaIndex;
use annidx::Metric;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Row-major `uniform[0, 1]` corpus, deterministic for a fixed seed.
fn uniform_corpus(n: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect())
        .collect()
}

fn vamana_build_params() -> annidx::vamana::config::VamanaBuildParameters {
    VamanaBuildParametersBuilder::new()
        .max_degree(64)
        .build(Metric::L2)
        .unwrap()
}

/// Scenario 1: L2 k-NN on float32. Every query is a corpus vector itself,
/// so the exact match must come back as the closest neighbor at distance 0.
#[test]
fn l2_knn_returns_exact_self_match() {
    let vectors = uniform_corpus(100, 64, 123);
    let ids: Vec<u64> = (0..100).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();

    for i in 0..5usize {
        let results = index
            .search(&vectors[i], 10, VamanaSearchParameters::default(), None)
            .unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(results[0].0, i as u64);
        assert!(results[0].1.abs() < 1e-6, "expected distance 0.0, got {}", results[0].1);
    }
}

/// Scenario 2: save/load round trip — identical labels and distances
/// before and after reloading from an in-memory byte buffer.
#[test]
fn save_load_round_trip_matches_original_search() {
    let vectors = uniform_corpus(100, 64, 123);
    let ids: Vec<u64> = (0..100).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();

    let mut buffer = Vec::new();
    index.save(&mut buffer).unwrap();
    let restored = DynamicVamanaIndex::load(buffer.as_slice()).unwrap();

    for i in 0..5usize {
        let before = index.search(&vectors[i], 10, VamanaSearchParameters::default(), None).unwrap();
        let after = restored.search(&vectors[i], 10, VamanaSearchParameters::default(), None).unwrap();
        assert_eq!(before, after);
    }
}

/// Scenario 3: delete then search — deleted ids never reappear, and
/// recall against the pre-deletion groundtruth (deleted ids excluded)
/// stays high.
#[test]
fn delete_then_search_excludes_deleted_ids_with_high_recall() {
    let vectors = uniform_corpus(100, 64, 123);
    let ids: Vec<u64> = (0..100).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();
    let flat = FlatIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32).unwrap();

    let deleted: [u64; 5] = [0, 5, 10, 15, 20];
    for &id in &deleted {
        index.remove(id).unwrap();
    }

    for i in 0..5usize {
        let results = index
            .search(&vectors[i], 10, VamanaSearchParameters::default(), None)
            .unwrap();
        assert!(results.iter().all(|&(id, _)| !deleted.contains(&id)));
        if i == 0 {
            assert_ne!(results[0].0, 0);
        }

        let mut groundtruth: Vec<(u64, f32)> = flat
            .search(&vectors[i], 30, None)
            .unwrap()
            .into_iter()
            .filter(|(id, _)| !deleted.contains(id))
            .collect();
        groundtruth.truncate(10);
        let recall = recall_at_k(&results, &groundtruth, 10);
        assert!(recall >= 0.9, "recall {recall} below 0.9 for query {i}");
    }
}

/// Scenario 4: IVF insert + delete + compact cycle.
#[test]
fn ivf_insert_delete_compact_cycle_preserves_recall() {
    let corpus = uniform_corpus(10_000, 128, 7);
    let ids: Vec<u64> = (0..10_000).collect();
    let half = 5_000;

    let build_params = IvfBuildParametersBuilder::new()
        .n_clusters(10)
        .seed(7)
        .build(half)
        .unwrap();
    let index = DynamicIvfIndex::build(&corpus[..half], &ids[..half], Metric::L2, build_params).unwrap();
    for i in half..corpus.len() {
        index.add(ids[i], &corpus[i]).unwrap();
    }
    assert_eq!(index.len(), 10_000);

    let mut rng = StdRng::seed_from_u64(99);
    let mut to_delete: Vec<u64> = (0..10_000u64).collect();
    // Fisher-Yates partial shuffle to pick a uniformly random 10% subset.
    for i in 0..1_000 {
        let j = rng.random_range(i..to_delete.len());
        to_delete.swap(i, j);
    }
    let to_delete = &to_delete[..1_000];
    let removed = index.remove_selected(to_delete).unwrap();
    assert_eq!(removed, 1_000);

    index.compact().unwrap();
    assert_eq!(index.len(), 9_000);
    for &id in to_delete {
        assert!(!index.has_id(id));
    }

    let flat = FlatIndex::build(&corpus, &ids, Metric::L2, ElementKind::Float32).unwrap();
    for &id in to_delete {
        flat.remove(id).unwrap();
    }

    let search_params = IvfSearchParametersBuilder::new().n_probes(10).build();
    let mut query_rng = StdRng::seed_from_u64(11);
    let query_indices: Vec<usize> = (0..1_000).map(|_| query_rng.random_range(0..corpus.len())).collect();

    let mut total_recall = 0.0f32;
    for &qi in &query_indices {
        let approx = index.search(&corpus[qi], 10, search_params, None).unwrap();
        assert!(approx.iter().all(|&(id, _)| !to_delete.contains(&id)));
        let exact = flat.search(&corpus[qi], 10, None).unwrap();
        total_recall += recall_at_k(&approx, &exact, 10);
    }
    let mean_recall = total_recall / query_indices.len() as f32;
    assert!(mean_recall >= 0.98, "mean recall {mean_recall} below 0.98");
}

/// Scenario 5: filtered search — every result lies in the filter's range
/// and the result count is exactly `k`.
#[test]
fn filtered_search_restricts_results_to_id_range() {
    let vectors = uniform_corpus(100, 64, 123);
    let ids: Vec<u64> = (0..100).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();

    let filter = |id: u64| (20..80).contains(&id);
    for i in 0..5usize {
        let results = index
            .search(&vectors[i], 10, VamanaSearchParameters::default(), Some(&filter))
            .unwrap();
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|&(id, _)| (20..80).contains(&id)));
    }
}

/// Scenario 6: range search — every returned distance satisfies the
/// metric's within-radius predicate, for both a small and a large radius.
#[test]
fn range_search_respects_radius_predicate() {
    let vectors = uniform_corpus(100, 64, 123);
    let ids: Vec<u64> = (0..100).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();

    for &radius in &[0.05f32, 5.0f32] {
        for i in 0..5usize {
            let mut sink = VecRangeSink::new();
            index
                .range_search(&vectors[i], radius, &mut sink, VamanaSearchParameters::default(), None)
                .unwrap();
            for &(_, distance) in &sink.results {
                assert!(distance <= radius, "distance {distance} exceeds radius {radius}");
            }
        }
    }
    // The small radius can only ever contain the query's exact self-match
    // (distance 0.0); the large radius should pull in the rest of the
    // dense unit-cube corpus.
    let mut small_sink = VecRangeSink::new();
    index
        .range_search(&vectors[0], 0.05, &mut small_sink, VamanaSearchParameters::default(), None)
        .unwrap();
    let mut large_sink = VecRangeSink::new();
    index
        .range_search(&vectors[0], 5.0, &mut large_sink, VamanaSearchParameters::default(), None)
        .unwrap();
    assert!(large_sink.results.len() >= small_sink.results.len());
}

/// Idempotence: running `consolidate` twice in a row leaves the graph
/// unchanged the second time (no further vertices reclaimed).
#[test]
fn consolidate_is_idempotent() {
    let vectors = uniform_corpus(200, 32, 321);
    let ids: Vec<u64> = (0..200).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();
    for &id in ids.iter().step_by(7) {
        index.remove(id).unwrap();
    }

    let first = index.consolidate().unwrap();
    assert!(first > 0);
    let second = index.consolidate().unwrap();
    assert_eq!(second, 0, "second consolidate reclaimed {second} additional vertices");
}

/// Reinsert equivalence: deleting a batch, consolidating, then
/// re-inserting the same ids with the same vectors keeps recall close to
/// the pre-deletion graph.
#[test]
fn reinsert_after_consolidate_preserves_recall() {
    let vectors = uniform_corpus(300, 32, 55);
    let ids: Vec<u64> = (0..300).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();
    let flat = FlatIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32).unwrap();

    let queries: Vec<usize> = (0..20).collect();
    let original_recall = |idx: &DynamicVamanaIndex| -> f32 {
        let mut total = 0.0;
        for &qi in &queries {
            let approx = idx.search(&vectors[qi], 10, VamanaSearchParameters::default(), None).unwrap();
            let exact = flat.search(&vectors[qi], 10, None).unwrap();
            total += recall_at_k(&approx, &exact, 10);
        }
        total / queries.len() as f32
    };
    let before = original_recall(&index);

    let to_remove: Vec<u64> = ids[100..150].to_vec();
    for &id in &to_remove {
        index.remove(id).unwrap();
    }
    index.consolidate().unwrap();
    for &id in &to_remove {
        index.add(id, &vectors[id as usize]).unwrap();
    }

    let after = original_recall(&index);
    assert!(
        (before - after).abs() <= 0.02 + 0.05,
        "recall drifted from {before} to {after}"
    );
}

/// Compaction preserves identity: every surviving external id is still
/// present and an exact self-search still returns itself as the 1-NN.
#[test]
fn compaction_preserves_identity() {
    let vectors = uniform_corpus(150, 32, 8);
    let ids: Vec<u64> = (0..150).collect();
    let index = DynamicVamanaIndex::build(&vectors, &ids, Metric::L2, ElementKind::Float32, vamana_build_params()).unwrap();

    let to_remove: Vec<u64> = ids.iter().copied().step_by(3).collect();
    for &id in &to_remove {
        index.remove(id).unwrap();
    }
    index.consolidate().unwrap();
    index.compact().unwrap();

    for &id in &ids {
        if to_remove.contains(&id) {
            assert!(!index.has_id(id));
            continue;
        }
        assert!(index.has_id(id));
        let results = index
            .search(&vectors[id as usize], 1, VamanaSearchParameters::default(), None)
            .unwrap();
        assert_eq!(results[0].0, id);
    }
}
