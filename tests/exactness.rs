//! Exactness tests against brute force.
//!
//! The two-pass scanner promises exact top-k over the probed partitions for
//! any slack weight; the radius scanner promises the complete eps
//! neighborhood. Both are checked against brute-force reference answers on
//! seeded synthetic datasets.

use geiton::{
    build_chunk_index, finalize_distances, knn_search, landmark_distances,
    nearest_landmark_assignments, resolve_identifiers, scan_knn, scan_radius, DistanceMetric,
    LandmarkIndex, ProbeList, RadiusMode, SENTINEL_ID,
};
use rand::prelude::*;
use std::collections::HashSet;

fn random_points(n: usize, dim: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n * dim).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect()
}

fn build_index(points: Vec<f32>, dim: usize, num_landmarks: usize, seed: u64) -> LandmarkIndex {
    let mut rng = StdRng::seed_from_u64(seed);
    let num_points = points.len() / dim;
    // Use a random subset of the points as landmarks.
    let landmarks: Vec<f32> = (0..num_landmarks)
        .flat_map(|_| {
            let i = rng.gen_range(0..num_points);
            points[i * dim..(i + 1) * dim].to_vec()
        })
        .collect();
    let assignments = nearest_landmark_assignments(&points, dim, &landmarks).unwrap();
    LandmarkIndex::from_assignments(points, dim, landmarks, &assignments).unwrap()
}

fn brute_force_knn(points: &[f32], dim: usize, query: &[f32], k: usize) -> Vec<(f32, u32)> {
    let mut all: Vec<(f32, u32)> = points
        .chunks_exact(dim)
        .enumerate()
        .map(|(id, p)| {
            let d: f32 = p.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
            (d, id as u32)
        })
        .collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0));
    all.truncate(k);
    all
}

fn brute_force_radius(points: &[f32], dim: usize, query: &[f32], eps: f32) -> HashSet<u32> {
    points
        .chunks_exact(dim)
        .enumerate()
        .filter_map(|(id, p)| {
            let d: f32 = p.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
            (d.sqrt() <= eps).then_some(id as u32)
        })
        .collect()
}

// =============================================================================
// k-NN exactness
// =============================================================================

#[test]
fn knn_matches_brute_force_for_all_slack_weights() {
    let dim = 8;
    let num_points = 300;
    let k = 10;
    let points = random_points(num_points, dim, 7);
    let index = build_index(points.clone(), dim, 16, 8);

    let num_queries = 25;
    let queries = random_points(num_queries, dim, 9);
    let probes: Vec<ProbeList> = vec![index.full_probe_list(); num_queries];

    for slack_weight in [1.0f32, 1.5, 3.0] {
        let results = knn_search(
            &index,
            &queries,
            &probes,
            k,
            slack_weight,
            DistanceMetric::SquaredL2,
            1.0,
        )
        .unwrap();

        for q in 0..num_queries {
            let query = &queries[q * dim..(q + 1) * dim];
            let expected = brute_force_knn(&points, dim, query, k);
            // Compare by identifier set; ties may legally reorder.
            let got: HashSet<u32> = results.ids().row(q).iter().copied().collect();
            let want: HashSet<u32> = expected.iter().map(|&(_, id)| id).collect();
            assert_eq!(
                got, want,
                "query {q} at slack weight {slack_weight} is not exact"
            );
            // Distances must agree rank by rank.
            for (rank, &(want_dist, _)) in expected.iter().enumerate() {
                let got_dist = results.distances().row(q)[rank];
                assert!(
                    (got_dist - want_dist).abs() <= 1e-4 * want_dist.max(1.0),
                    "query {q} rank {rank}: {got_dist} vs {want_dist}"
                );
            }
        }
    }
}

#[test]
fn slack_reduces_pass_one_work_without_losing_exactness() {
    let dim = 4;
    let points = random_points(500, dim, 21);
    let index = build_index(points, dim, 25, 22);
    let queries = random_points(10, dim, 23);
    let probes: Vec<ProbeList> = vec![index.full_probe_list(); 10];

    let exact = knn_search(&index, &queries, &probes, 5, 1.0, DistanceMetric::L2, 1.0).unwrap();
    let slack = knn_search(&index, &queries, &probes, 5, 2.0, DistanceMetric::L2, 1.0).unwrap();

    for q in 0..10 {
        let a: HashSet<u32> = exact.ids().row(q).iter().copied().collect();
        let b: HashSet<u32> = slack.ids().row(q).iter().copied().collect();
        assert_eq!(a, b, "slack weight changed the result set for query {q}");
    }
}

#[test]
fn euclidean_distances_are_square_roots_of_raw() {
    let dim = 3;
    let points = random_points(60, dim, 31);
    let index = build_index(points.clone(), dim, 6, 32);
    let queries = random_points(4, dim, 33);
    let probes: Vec<ProbeList> = vec![index.full_probe_list(); 4];

    let sq = knn_search(
        &index,
        &queries,
        &probes,
        3,
        1.0,
        DistanceMetric::SquaredL2,
        1.0,
    )
    .unwrap();
    let l2 = knn_search(&index, &queries, &probes, 3, 1.0, DistanceMetric::L2, 1.0).unwrap();
    for slot in 0..sq.distances().as_slice().len() {
        let a = sq.distances().as_slice()[slot];
        let b = l2.distances().as_slice()[slot];
        assert!((b * b - a).abs() <= 1e-3 * a.max(1.0));
    }
}

// =============================================================================
// Radius completeness
// =============================================================================

#[test]
fn radius_scan_is_complete_in_both_modes() {
    let dim = 5;
    let points = random_points(200, dim, 41);
    let index = build_index(points.clone(), dim, 12, 42);
    let num_queries = 15;
    let queries = random_points(num_queries, dim, 43);
    let probes: Vec<ProbeList> = vec![index.full_probe_list(); num_queries];
    let eps = 0.9f32;

    let dense = scan_radius(&index, &queries, &probes, eps, RadiusMode::Dense).unwrap();
    let sparse = scan_radius(&index, &queries, &probes, eps, RadiusMode::Sparse).unwrap();

    for q in 0..num_queries {
        let query = &queries[q * dim..(q + 1) * dim];
        let want = brute_force_radius(&points, dim, query, eps);
        let dense_got: HashSet<u32> = dense.neighbors(q).into_iter().collect();
        let sparse_got: HashSet<u32> = sparse.neighbors(q).into_iter().collect();
        assert_eq!(dense_got, want, "dense row {q} incomplete");
        assert_eq!(sparse_got, want, "sparse row {q} incomplete");
        assert_eq!(dense.degrees()[q] as usize, want.len());
        assert_eq!(sparse.degrees()[q] as usize, want.len());
    }
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

/// Probe sizes [3, 5, 2], k = 4: exactly 4 results resolve with no
/// sentinels, and the chunk table's last entry is the size sum 10.
#[test]
fn partial_fill_scenario() {
    let landmarks = vec![0.0, 10.0, 20.0];
    let mut points = Vec::new();
    for (center, n) in [(0.0f32, 3), (10.0, 5), (20.0, 2)] {
        for i in 0..n {
            points.push(center + i as f32 * 0.1);
        }
    }
    let assignments = nearest_landmark_assignments(&points, 1, &landmarks).unwrap();
    let index = LandmarkIndex::from_assignments(points, 1, landmarks, &assignments).unwrap();

    let probes: Vec<ProbeList> = vec![index.full_probe_list()];
    let chunks = build_chunk_index(&probes, &index).unwrap();
    assert_eq!(chunks.table(0), &[3, 8, 10]);
    assert_eq!(chunks.sample_count(0), 10);

    let queries = vec![0.05f32];
    let results = knn_search(
        &index,
        &queries,
        &probes,
        4,
        1.0,
        DistanceMetric::L2,
        1.0,
    )
    .unwrap();
    let ids = results.ids().row(0);
    assert_eq!(ids.iter().filter(|&&id| id == SENTINEL_ID).count(), 0);
    assert_eq!(ids.len(), 4);
}

/// The staged pipeline and the convenience entry point agree.
#[test]
fn staged_pipeline_matches_knn_search() {
    let dim = 4;
    let points = random_points(120, dim, 51);
    let index = build_index(points, dim, 8, 52);
    let queries = random_points(6, dim, 53);
    let probes: Vec<ProbeList> = vec![index.full_probe_list(); 6];
    let k = 5;

    let ld = landmark_distances(&index, &queries, &probes).unwrap();
    let chunks = build_chunk_index(&probes, &index).unwrap();
    let scanned = scan_knn(&index, &queries, &probes, k, &ld, 1.0).unwrap();
    let ids = resolve_identifiers(scanned.offsets(), &probes, &chunks, &index).unwrap();
    let dists =
        finalize_distances(scanned.raw_distances().as_slice(), DistanceMetric::L2, 1.0).unwrap();

    let combined = knn_search(&index, &queries, &probes, k, 1.0, DistanceMetric::L2, 1.0).unwrap();
    assert_eq!(ids.as_slice(), combined.ids().as_slice());
    assert_eq!(&dists, combined.distances().as_slice());
    assert_eq!(scanned.eval_counts(), combined.eval_counts());
}
