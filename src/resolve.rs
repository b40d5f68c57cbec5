//! Flat-offset to global-identifier resolution.
//!
//! The scanner reports candidates by their flat offsets into each query's
//! logical candidate sequence. Resolution runs the chunk locator on every
//! result slot independently, then indexes the owning partition's member
//! table. The lookup is a pure function of its inputs: resolving the same
//! offset twice yields the same identifier, and no two slots share a write
//! target, so slots resolve in full parallel.

use crate::chunk::{locate, ChunkIndex, ChunkLocation};
use crate::error::{QueryError, Result};
use crate::index::{LandmarkIndex, ProbeList};
use crate::layout::Grid;
use rayon::prelude::*;

/// Global-identifier sentinel for unresolved result slots.
///
/// The maximum representable identifier, distinguishable from any real
/// dataset row id.
pub const SENTINEL_ID: u32 = u32::MAX;

/// Resolve flat candidate offsets to global dataset identifiers.
///
/// Slots whose offset lies at or beyond the query's total probed sample
/// count (including the scanner's unfilled-slot sentinel) resolve to
/// [`SENTINEL_ID`]; callers check for the sentinel rather than expect an
/// error.
pub fn resolve_identifiers(
    offsets: &Grid<u32>,
    probe_lists: &[ProbeList],
    chunks: &ChunkIndex,
    index: &LandmarkIndex,
) -> Result<Grid<u32>> {
    let num_queries = offsets.rows();
    if probe_lists.len() != num_queries || chunks.num_queries() != num_queries {
        return Err(QueryError::InvalidParameter(format!(
            "offset rows ({num_queries}), probe lists ({}) and chunk tables ({}) disagree",
            probe_lists.len(),
            chunks.num_queries()
        )));
    }
    let k = offsets.cols();
    if k == 0 {
        return Ok(Grid::filled(num_queries, 0, SENTINEL_ID));
    }

    let ids: Vec<u32> = offsets
        .as_slice()
        .par_iter()
        .enumerate()
        .map(|(slot, &offset)| {
            let q = slot / k;
            match locate(chunks.table(q), offset) {
                ChunkLocation::OutOfRange => SENTINEL_ID,
                ChunkLocation::Within { chunk, local } => {
                    let p = probe_lists[q][chunk as usize];
                    index.member_ids(p)[local as usize]
                }
            }
        })
        .collect();
    Ok(Grid::from_vec(ids, num_queries, k)?)
}
