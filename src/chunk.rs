//! Chunked-offset bookkeeping for ragged per-query partition scans.
//!
//! Each query's probed partitions contribute differently sized chunks to a
//! logical candidate sequence that is never materialized. The chunk table
//! (inclusive prefix sums over probed partition sizes) makes that sequence
//! flat-addressable: any offset in `[0, total)` can be mapped back to its
//! owning partition and a local offset with one binary search.

use crate::error::{QueryError, Result};
use crate::index::{LandmarkIndex, ProbeList};
use crate::layout::Grid;
use rayon::prelude::*;

/// Per-batch chunk tables and sample counts.
///
/// Row `q` of `tables` holds P non-decreasing entries; entry `i` is the
/// cumulative number of candidates contributed by `probe_lists[q][0..=i]`.
/// The last entry equals `sample_counts[q]`.
#[derive(Debug, Clone)]
pub struct ChunkIndex {
    tables: Grid<u32>,
    sample_counts: Vec<u32>,
}

impl ChunkIndex {
    /// Chunk table of query `q`.
    #[inline]
    #[must_use]
    pub fn table(&self, q: usize) -> &[u32] {
        self.tables.row(q)
    }

    /// Total probed sample count of query `q`.
    #[inline]
    #[must_use]
    pub fn sample_count(&self, q: usize) -> u32 {
        self.sample_counts[q]
    }

    #[inline]
    #[must_use]
    pub fn num_queries(&self) -> usize {
        self.tables.rows()
    }

    /// Probe-list length P shared by the batch.
    #[inline]
    #[must_use]
    pub fn probe_len(&self) -> usize {
        self.tables.cols()
    }
}

/// Location of a flat candidate offset within a query's probed partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLocation {
    /// Offset falls inside probed chunk `chunk`, at `local` within it.
    Within { chunk: u32, local: u32 },
    /// Offset is at or beyond the query's total probed sample count. At the
    /// serialized boundary this is the `chunk == P` sentinel.
    OutOfRange,
}

/// Build per-query chunk tables over the batch's probe lists.
///
/// All probe lists must share one length P and every probed partition id
/// must exist in the index. Queries are processed in parallel; within one
/// query the running sum is a sequential dependency chain.
pub fn build_chunk_index(probe_lists: &[ProbeList], index: &LandmarkIndex) -> Result<ChunkIndex> {
    let num_queries = probe_lists.len();
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

    if probe_len == 0 {
        // Empty probe lists: zero samples everywhere, empty tables.
        return Ok(ChunkIndex {
            tables: Grid::filled(num_queries, 0, 0),
            sample_counts: vec![0; num_queries],
        });
    }

    let mut tables = Grid::filled(num_queries, probe_len, 0u32);
    let mut sample_counts = vec![0u32; num_queries];
    tables
        .as_mut_slice()
        .par_chunks_mut(probe_len)
        .zip(sample_counts.par_iter_mut())
        .zip(probe_lists.par_iter())
        .for_each(|((row, count), probes)| {
            let mut running = 0u32;
            for (entry, &p) in row.iter_mut().zip(probes.iter()) {
                running += index.partition_size(p);
                *entry = running;
            }
            *count = running;
        });

    Ok(ChunkIndex {
        tables,
        sample_counts,
    })
}

/// Map a flat candidate offset to its owning chunk and local offset.
///
/// Upper-bound binary search: the owning chunk is the smallest `c` with
/// `table[c] > offset`. O(log P), no shared state.
#[inline]
#[must_use]
pub fn locate(table: &[u32], offset: u32) -> ChunkLocation {
    let c = table.partition_point(|&entry| entry <= offset);
    if c == table.len() {
        return ChunkLocation::OutOfRange;
    }
    let base = if c == 0 { 0 } else { table[c - 1] };
    ChunkLocation::Within {
        chunk: c as u32,
        local: offset - base,
    }
}
