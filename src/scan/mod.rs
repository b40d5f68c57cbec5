//! Partition scanners.
//!
//! Two consumers of a batch's probe lists:
//!
//! - [`knn`]: the two-pass landmark scanner. Pass one scans with a slack
//!   factor on the triangle-inequality pruning bound (fast, possibly
//!   inexact); pass two re-examines skipped partitions with the slack fixed
//!   to 1, restoring exactness.
//! - [`radius`]: single-pass eps-neighborhood scanner. No pruning applies;
//!   radius membership has no best-so-far bound to exploit.
//!
//! Both scan in the squared-L2 raw domain; [`crate::distance::finalize_distances`]
//! produces user-facing distances afterwards.

pub mod knn;
pub mod radius;

pub use knn::{scan_knn, KnnScan};
pub use radius::{scan_radius, RadiusMode, RadiusScan};

use crate::distance;
use crate::error::{QueryError, Result};
use crate::index::{LandmarkIndex, ProbeList};
use crate::layout::Grid;
use rayon::prelude::*;

/// Compute the per-query landmark-distance table for a batch.
///
/// Row `q`, column `i` holds the unsquared distance from query `q` to the
/// landmark of `probe_lists[q][i]`. Probe selection normally computes these
/// as a by-product; this helper exists for callers (and tests) that only
/// have raw query coordinates.
pub fn landmark_distances(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
) -> Result<Grid<f32>> {
    let (num_queries, probe_len) = validate_batch(index, queries, probe_lists)?;
    if probe_len == 0 {
        return Ok(Grid::filled(num_queries, 0, 0.0));
    }
    let dim = index.dimension();
    let mut table = Grid::filled(num_queries, probe_len, 0.0f32);
    table
        .as_mut_slice()
        .par_chunks_mut(probe_len)
        .enumerate()
        .for_each(|(q, row)| {
            let query = &queries[q * dim..(q + 1) * dim];
            for (entry, &p) in row.iter_mut().zip(probe_lists[q].iter()) {
                *entry = distance::squared_l2(query, index.landmark(p)).sqrt();
            }
        });
    Ok(table)
}

/// Validate the query/probe-list batch shape shared by both scanners.
///
/// Returns `(num_queries, probe_len)`.
pub(crate) fn validate_batch(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
) -> Result<(usize, usize)> {
    let dim = index.dimension();
    if queries.len() % dim != 0 {
        return Err(QueryError::DimensionMismatch {
            query_len: queries.len(),
            index_dim: dim,
        });
    }
    let num_queries = queries.len() / dim;
    if num_queries != probe_lists.len() {
        return Err(QueryError::InvalidParameter(format!(
            "{num_queries} queries but {} probe lists",
            probe_lists.len()
        )));
    }
    let probe_len = probe_lists.first().map_or(0, |p| p.len());
    for (q, probes) in probe_lists.iter().enumerate() {
        if probes.len() != probe_len {
            return Err(QueryError::InvalidParameter(format!(
                "probe list {q} has length {}, batch uses {probe_len}",
                probes.len()
            )));
        }
        if let Some(&p) = probes.iter().find(|&&p| p as usize >= index.num_partitions()) {
            return Err(QueryError::InvalidParameter(format!(
                "probe list {q} references partition {p}, index has {}",
                index.num_partitions()
            )));
        }
    }
    Ok((num_queries, probe_len))
}
