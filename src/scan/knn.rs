//! Two-pass landmark scanner for exact batched k-NN.
//!
//! Pass one walks each query's probe list, scanning a partition's members
//! only when the partition could still improve the running top-k. The
//! pruning test multiplies the triangle-inequality lower bound by
//! `slack_weight`: weights above 1 skip more partitions (faster, possibly
//! inexact). Pass two re-tests every skipped partition with the weight
//! fixed to 1 and scans any survivor fully, which restores exactness; the
//! probe list is finite and slack is applied only once, so two passes
//! always suffice.

use crate::distance;
use crate::error::{QueryError, Result};
use crate::index::{LandmarkIndex, ProbeList};
use crate::layout::Grid;
use crate::scan::validate_batch;
use crate::topk::TopK;
use rayon::prelude::*;
use smallvec::SmallVec;

/// Flat-offset sentinel for unfilled result slots.
pub const SENTINEL_OFFSET: u32 = u32::MAX;
/// Raw-distance sentinel for unfilled result slots.
pub const SENTINEL_DISTANCE: f32 = f32::MAX;

/// Raw output of the two-pass scanner.
///
/// Offsets address each query's logical candidate sequence (chunk-table
/// domain); they still need [`crate::resolve::resolve_identifiers`] to
/// become global ids, and the raw distances need
/// [`crate::distance::finalize_distances`].
#[derive(Debug, Clone)]
pub struct KnnScan {
    offsets: Grid<u32>,
    raw_distances: Grid<f32>,
    eval_counts: Vec<u32>,
}

impl KnnScan {
    /// Flat candidate offsets, `num_queries x k`, ascending by distance.
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &Grid<u32> {
        &self.offsets
    }

    /// Raw squared-L2 distances, `num_queries x k`.
    #[inline]
    #[must_use]
    pub fn raw_distances(&self) -> &Grid<f32> {
        &self.raw_distances
    }

    /// True distance evaluations performed per query, both passes combined.
    ///
    /// Diagnostic for adaptive slack tuning.
    #[inline]
    #[must_use]
    pub fn eval_counts(&self) -> &[u32] {
        &self.eval_counts
    }

    /// Total true distance evaluations over the batch.
    #[must_use]
    pub fn total_evals(&self) -> u64 {
        self.eval_counts.iter().map(|&c| c as u64).sum()
    }

    #[inline]
    #[must_use]
    pub fn k(&self) -> usize {
        self.offsets.cols()
    }
}

/// Exact batched k-NN over each query's probed partitions.
///
/// `landmark_dists` is row-major, aligned with `probe_lists`: entry
/// `(q, i)` is the unsquared distance from query `q` to the landmark of
/// `probe_lists[q][i]` (see [`crate::scan::landmark_distances`]).
/// `slack_weight` must be at least 1; 1 means no slack and makes pass one
/// already exact.
///
/// Queries with fewer than `k` probed candidates fill remaining slots with
/// [`SENTINEL_OFFSET`] and [`SENTINEL_DISTANCE`]; that is a defined
/// outcome, not an error.
pub fn scan_knn(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
    k: usize,
    landmark_dists: &Grid<f32>,
    slack_weight: f32,
) -> Result<KnnScan> {
    if k == 0 {
        return Err(QueryError::InvalidParameter(
            "k must be greater than 0".to_string(),
        ));
    }
    if !slack_weight.is_finite() || slack_weight < 1.0 {
        return Err(QueryError::InvalidParameter(format!(
            "slack weight must be finite and >= 1, got {slack_weight}"
        )));
    }
    let (num_queries, probe_len) = validate_batch(index, queries, probe_lists)?;
    if landmark_dists.rows() != num_queries || landmark_dists.cols() != probe_len {
        return Err(QueryError::InvalidParameter(format!(
            "landmark-distance table is {}x{}, batch is {num_queries}x{probe_len}",
            landmark_dists.rows(),
            landmark_dists.cols()
        )));
    }

    let dim = index.dimension();
    let mut offsets = Grid::filled(num_queries, k, SENTINEL_OFFSET);
    let mut raw_distances = Grid::filled(num_queries, k, SENTINEL_DISTANCE);
    let mut eval_counts = vec![0u32; num_queries];

    offsets
        .as_mut_slice()
        .par_chunks_mut(k)
        .zip(raw_distances.as_mut_slice().par_chunks_mut(k))
        .zip(eval_counts.par_iter_mut())
        .enumerate()
        .for_each(|(q, ((offset_row, dist_row), evals))| {
            let query = &queries[q * dim..(q + 1) * dim];
            let probes = &probe_lists[q];
            let ld = landmark_dists.row(q);

            let mut top = TopK::new(k);
            let mut scanned: SmallVec<[bool; 16]> = SmallVec::from_elem(false, probes.len());

            // Pass one: slack-weighted pruning.
            let mut base = 0u32;
            for (i, &p) in probes.iter().enumerate() {
                let size = index.partition_size(p);
                let lower = (ld[i] - index.radius(p)).max(0.0);
                if top.is_full() && slack_weight * lower > top.threshold().sqrt() {
                    base += size;
                    continue;
                }
                scanned[i] = true;
                scan_partition(index, query, p, base, &mut top, evals);
                base += size;
            }

            // Pass two: exactness mode, weight fixed to 1. Partitions skipped
            // in pass one all have landmark distance > radius, so |d - r| is
            // a valid lower bound for their members.
            let mut base = 0u32;
            for (i, &p) in probes.iter().enumerate() {
                let size = index.partition_size(p);
                if !scanned[i] {
                    let lower = (ld[i] - index.radius(p)).abs();
                    if lower < top.threshold().sqrt() {
                        scan_partition(index, query, p, base, &mut top, evals);
                    }
                }
                base += size;
            }

            for (slot, (dist, offset)) in top.into_sorted().into_iter().enumerate() {
                dist_row[slot] = dist;
                offset_row[slot] = offset;
            }
        });

    Ok(KnnScan {
        offsets,
        raw_distances,
        eval_counts,
    })
}

/// Scan every member of partition `p`, proposing each as a candidate at its
/// flat offset `base + local`.
#[inline]
fn scan_partition(
    index: &LandmarkIndex,
    query: &[f32],
    p: u32,
    base: u32,
    top: &mut TopK,
    evals: &mut u32,
) {
    for (local, &id) in index.member_ids(p).iter().enumerate() {
        let raw = distance::squared_l2(query, index.point(id));
        *evals += 1;
        top.push(raw, base + local as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::nearest_landmark_assignments;
    use crate::scan::landmark_distances;
    use smallvec::smallvec;

    /// 1D index: members at 0.0..0.3 around landmark 0, 10.0..10.4 around
    /// landmark 10, 20.0..20.1 around landmark 20.
    fn line_index() -> LandmarkIndex {
        let landmarks = vec![0.0, 10.0, 20.0];
        let mut points = Vec::new();
        for (center, n) in [(0.0, 3), (10.0, 5), (20.0, 2)] {
            for i in 0..n {
                points.push(center + i as f32 * 0.1);
            }
        }
        let assignments = nearest_landmark_assignments(&points, 1, &landmarks).unwrap();
        LandmarkIndex::from_assignments(points, 1, landmarks, &assignments).unwrap()
    }

    #[test]
    fn finds_nearest_in_probe_order_domain() {
        let index = line_index();
        let queries = vec![0.05f32];
        let probes: Vec<ProbeList> = vec![smallvec![0, 1, 2]];
        let ld = landmark_distances(&index, &queries, &probes).unwrap();
        let scan = scan_knn(&index, &queries, &probes, 2, &ld, 1.0).unwrap();
        // Flat offsets 0 and 1 are the first two members of partition 0.
        assert_eq!(scan.offsets().row(0), &[0, 1]);
        assert!(scan.raw_distances().row(0)[0] <= scan.raw_distances().row(0)[1]);
    }

    #[test]
    fn distant_partitions_are_pruned() {
        let index = line_index();
        let queries = vec![0.0f32];
        let probes: Vec<ProbeList> = vec![smallvec![0, 1, 2]];
        let ld = landmark_distances(&index, &queries, &probes).unwrap();
        let scan = scan_knn(&index, &queries, &probes, 2, &ld, 1.0).unwrap();
        // Partitions 1 and 2 are far beyond the k-th best; only the 3
        // members of partition 0 should have been evaluated.
        assert_eq!(scan.eval_counts(), &[3]);
    }

    #[test]
    fn data_exhaustion_fills_sentinels() {
        let index = line_index();
        let queries = vec![20.0f32];
        let probes: Vec<ProbeList> = vec![smallvec![2]];
        let ld = landmark_distances(&index, &queries, &probes).unwrap();
        let scan = scan_knn(&index, &queries, &probes, 4, &ld, 1.0).unwrap();
        let offsets = scan.offsets().row(0);
        assert_ne!(offsets[0], SENTINEL_OFFSET);
        assert_ne!(offsets[1], SENTINEL_OFFSET);
        assert_eq!(&offsets[2..], &[SENTINEL_OFFSET, SENTINEL_OFFSET]);
        assert_eq!(scan.raw_distances().row(0)[2], SENTINEL_DISTANCE);
    }

    #[test]
    fn empty_probe_list_is_all_sentinels() {
        let index = line_index();
        let queries = vec![5.0f32];
        let probes: Vec<ProbeList> = vec![smallvec![]];
        let ld = landmark_distances(&index, &queries, &probes).unwrap();
        let scan = scan_knn(&index, &queries, &probes, 3, &ld, 1.0).unwrap();
        assert_eq!(scan.offsets().row(0), &[SENTINEL_OFFSET; 3]);
        assert_eq!(scan.eval_counts(), &[0]);
    }

    #[test]
    fn invalid_parameters_are_fatal() {
        let index = line_index();
        let queries = vec![0.0f32];
        let probes: Vec<ProbeList> = vec![smallvec![0]];
        let ld = landmark_distances(&index, &queries, &probes).unwrap();
        assert!(matches!(
            scan_knn(&index, &queries, &probes, 0, &ld, 1.0),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            scan_knn(&index, &queries, &probes, 2, &ld, 0.5),
            Err(QueryError::InvalidParameter(_))
        ));
    }
}
