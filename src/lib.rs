//! geiton: batched exact nearest-neighbor queries over landmark partitions.
//!
//! The dataset is partitioned upstream into landmark balls (or clusters);
//! probe selection hands each query in a batch a short list of partitions
//! worth scanning. This crate is the result-assembly and correctness layer
//! on top of that:
//!
//! - `chunk/`: per-query prefix sums turn ragged partition scans into a flat
//!   addressable candidate sequence, plus the binary-search locator mapping
//!   a flat offset back to (partition, local offset)
//! - `scan/`: the two-pass landmark scanner (exact top-k via
//!   triangle-inequality pruning with a slack factor on pass one, no slack
//!   on pass two) and the single-pass radius scanner
//! - `resolve/`: partition-local offsets back to global dataset ids
//! - `distance/`: metrics, the raw squared-L2 evaluator, and final distance
//!   normalization
//!
//! # Why two passes
//!
//! Pass one prunes a partition when `slack_weight x` its triangle-inequality
//! lower bound exceeds the running k-th best distance. With slack above 1
//! that can falsely prune a partition holding a true neighbor. Pass two
//! re-tests every skipped partition with the weight pinned to 1, so the
//! final top-k is exact, not merely approximate — the slack only trades
//! away pass-one work, never correctness.
//!
//! # Sentinels, not errors
//!
//! Fewer valid candidates than `k`, or a radius row with zero neighbors, is
//! a defined outcome: unfilled k-NN slots carry the maximum-representable
//! identifier ([`SENTINEL_ID`]) and `f32::MAX` raw distances; radius rows
//! carry zero degree. Only configuration errors (unsupported metric, malformed
//! extents, invalid parameters) fail a call.
//!
//! # Example
//!
//! ```rust
//! use geiton::{
//!     knn_search, nearest_landmark_assignments, DistanceMetric, LandmarkIndex, ProbeList,
//! };
//!
//! let points = vec![0.0, 0.2, 0.9, 5.0, 5.1, 5.3];
//! let landmarks = vec![0.5, 5.0];
//! let assignments = nearest_landmark_assignments(&points, 1, &landmarks).unwrap();
//! let index = LandmarkIndex::from_assignments(points, 1, landmarks, &assignments).unwrap();
//!
//! let queries = vec![0.1f32];
//! let probes: Vec<ProbeList> = vec![index.full_probe_list()];
//! let results = knn_search(&index, &queries, &probes, 2, 1.0, DistanceMetric::L2, 1.0).unwrap();
//! assert_eq!(results.ids().row(0), &[0, 1]);
//! ```

pub mod chunk;
pub mod distance;
pub mod error;
pub mod index;
pub mod layout;
pub mod resolve;
pub mod scan;
pub mod simd;
pub mod topk;

pub use chunk::{build_chunk_index, locate, ChunkIndex, ChunkLocation};
pub use distance::{finalize_distances, DistanceMetric};
pub use error::{QueryError, Result};
pub use index::{nearest_landmark_assignments, LandmarkIndex, ProbeList};
pub use layout::{Grid, LayoutError};
pub use resolve::{resolve_identifiers, SENTINEL_ID};
pub use scan::{landmark_distances, scan_knn, scan_radius, KnnScan, RadiusMode, RadiusScan};

/// Final k-NN results: global ids and metric-correct distances.
#[derive(Debug, Clone)]
pub struct KnnResults {
    ids: Grid<u32>,
    distances: Grid<f32>,
    eval_counts: Vec<u32>,
}

impl KnnResults {
    /// Global dataset ids, `num_queries x k`, rank-ordered ascending by
    /// distance. Unfilled slots hold [`SENTINEL_ID`].
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &Grid<u32> {
        &self.ids
    }

    /// Final distances, `num_queries x k`, aligned with [`Self::ids`].
    #[inline]
    #[must_use]
    pub fn distances(&self) -> &Grid<f32> {
        &self.distances
    }

    /// True distance evaluations performed per query.
    #[inline]
    #[must_use]
    pub fn eval_counts(&self) -> &[u32] {
        &self.eval_counts
    }
}

/// Run the full exact k-NN pipeline for one query batch.
///
/// Stages run in dependency order: chunk tables over the probe lists, the
/// two-pass landmark scan, identifier resolution, then distance
/// normalization with `scale` (pass `1.0` for unscaled data). `metric` must
/// satisfy the triangle inequality ([`DistanceMetric::SquaredL2`] or
/// [`DistanceMetric::L2`]); anything else is a fatal configuration error.
pub fn knn_search(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
    k: usize,
    slack_weight: f32,
    metric: DistanceMetric,
    scale: f32,
) -> Result<KnnResults> {
    if !metric.is_metric_space() {
        return Err(QueryError::UnsupportedMetric(metric));
    }
    let dists_to_landmarks = landmark_distances(index, queries, probe_lists)?;
    let chunks = build_chunk_index(probe_lists, index)?;
    let scanned = scan_knn(
        index,
        queries,
        probe_lists,
        k,
        &dists_to_landmarks,
        slack_weight,
    )?;
    let ids = resolve_identifiers(scanned.offsets(), probe_lists, &chunks, index)?;
    let finalized = finalize_distances(scanned.raw_distances().as_slice(), metric, scale)?;
    let num_queries = ids.rows();
    let distances = Grid::from_vec(finalized, num_queries, k)?;
    Ok(KnnResults {
        ids,
        distances,
        eval_counts: scanned.eval_counts().to_vec(),
    })
}

/// Run a radius query for one query batch.
///
/// Thin wrapper over [`scan_radius`]; the radius scanner already emits
/// global ids, so no resolution stage is needed.
pub fn radius_search(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
    eps: f32,
    mode: RadiusMode,
) -> Result<RadiusScan> {
    scan_radius(index, queries, probe_lists, eps, mode)
}
