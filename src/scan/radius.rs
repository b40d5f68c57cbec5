//! Single-pass eps-neighborhood scanner.
//!
//! Radius membership is not a monotone function of a best-so-far bound the
//! way k-NN is, so no pruning applies: every member of every probed
//! partition is evaluated. The output is a neighbor graph, either a dense
//! boolean adjacency over the full dataset or CSR-like sparse rows.

use crate::distance;
use crate::error::{QueryError, Result};
use crate::index::{LandmarkIndex, ProbeList};
use crate::layout::Grid;
use crate::scan::validate_batch;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Output representation for radius queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadiusMode {
    /// Boolean adjacency over the full dataset, `num_queries x num_points`.
    Dense,
    /// CSR-like rows: offsets, global column ids, per-query degree.
    Sparse,
}

/// Neighbor graph emitted by [`scan_radius`].
#[derive(Debug, Clone)]
pub enum RadiusScan {
    Dense {
        /// `num_queries x num_points`, indexed by global dataset id.
        adjacency: Grid<bool>,
        /// Neighbor count per query.
        degrees: Vec<u32>,
    },
    Sparse {
        /// `num_queries + 1` row offsets into `col_ids`.
        row_offsets: Vec<u32>,
        /// Global dataset ids, rows in partition-probe order then
        /// scan-encounter order.
        col_ids: Vec<u32>,
        /// Neighbor count per query.
        degrees: Vec<u32>,
    },
}

impl RadiusScan {
    /// Neighbor count per query. Zero degree is a defined outcome.
    #[must_use]
    pub fn degrees(&self) -> &[u32] {
        match self {
            RadiusScan::Dense { degrees, .. } | RadiusScan::Sparse { degrees, .. } => degrees,
        }
    }

    /// Global neighbor ids of query `q`.
    ///
    /// Dense rows come out in dataset-id order; sparse rows keep their
    /// stored order. No further ordering is guaranteed by the contract.
    #[must_use]
    pub fn neighbors(&self, q: usize) -> Vec<u32> {
        match self {
            RadiusScan::Dense { adjacency, .. } => adjacency
                .row(q)
                .iter()
                .enumerate()
                .filter_map(|(id, &hit)| hit.then_some(id as u32))
                .collect(),
            RadiusScan::Sparse {
                row_offsets,
                col_ids,
                ..
            } => col_ids[row_offsets[q] as usize..row_offsets[q + 1] as usize].to_vec(),
        }
    }
}

/// Batched eps-neighborhood search over each query's probed partitions.
///
/// A dataset point is a neighbor iff its true distance is at most `eps`
/// (unsquared domain; the comparison happens on squared raw scores).
pub fn scan_radius(
    index: &LandmarkIndex,
    queries: &[f32],
    probe_lists: &[ProbeList],
    eps: f32,
    mode: RadiusMode,
) -> Result<RadiusScan> {
    if !eps.is_finite() || eps < 0.0 {
        return Err(QueryError::InvalidParameter(format!(
            "eps must be finite and non-negative, got {eps}"
        )));
    }
    let (num_queries, _) = validate_batch(index, queries, probe_lists)?;
    let dim = index.dimension();
    let eps_sq = eps * eps;

    match mode {
        RadiusMode::Dense => {
            let num_points = index.num_points();
            let mut adjacency = Grid::filled(num_queries, num_points, false);
            let mut degrees = vec![0u32; num_queries];
            adjacency
                .as_mut_slice()
                .par_chunks_mut(num_points)
                .zip(degrees.par_iter_mut())
                .enumerate()
                .for_each(|(q, (row, degree))| {
                    let query = &queries[q * dim..(q + 1) * dim];
                    for &p in probe_lists[q].iter() {
                        for &id in index.member_ids(p) {
                            if distance::squared_l2(query, index.point(id)) <= eps_sq {
                                row[id as usize] = true;
                                *degree += 1;
                            }
                        }
                    }
                });
            Ok(RadiusScan::Dense { adjacency, degrees })
        }
        RadiusMode::Sparse => {
            let rows: Vec<Vec<u32>> = (0..num_queries)
                .into_par_iter()
                .map(|q| {
                    let query = &queries[q * dim..(q + 1) * dim];
                    let mut neighbors = Vec::new();
                    for &p in probe_lists[q].iter() {
                        for &id in index.member_ids(p) {
                            if distance::squared_l2(query, index.point(id)) <= eps_sq {
                                neighbors.push(id);
                            }
                        }
                    }
                    neighbors
                })
                .collect();

            let mut row_offsets = Vec::with_capacity(num_queries + 1);
            let mut col_ids = Vec::new();
            let mut degrees = Vec::with_capacity(num_queries);
            row_offsets.push(0u32);
            for row in rows {
                degrees.push(row.len() as u32);
                col_ids.extend_from_slice(&row);
                row_offsets.push(col_ids.len() as u32);
            }
            Ok(RadiusScan::Sparse {
                row_offsets,
                col_ids,
                degrees,
            })
        }
    }
}
