//! Landmark-partitioned dataset handle.
//!
//! Partition construction (choosing landmarks, assigning points) happens
//! upstream; [`LandmarkIndex`] is the query-side view of its output: per
//! partition, an owned member-identifier table, the landmark coordinates,
//! and the ball radius. Member tables are an indirection table — each
//! partition owns its own `Vec<u32>` and no partition aliases another's
//! storage. Everything here is read-only during a query batch, so queries
//! share the index freely across threads.

use crate::distance;
use crate::error::{QueryError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Per-query ordered list of partition ids selected for scanning.
///
/// Probe selection is external; this crate consumes probe lists read-only.
/// Typical probe counts are small, hence the inline capacity.
pub type ProbeList = SmallVec<[u32; 16]>;

/// One landmark ball: its members and geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PartitionData {
    /// Global dataset ids of the points assigned to this partition.
    member_ids: Vec<u32>,
    /// Max distance from the landmark to any member (unsquared).
    radius: f32,
}

/// Query-side view of a landmark-partitioned dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkIndex {
    /// SoA point storage, `num_points x dimension`.
    points: Vec<f32>,
    /// Landmark coordinates, `num_partitions x dimension`.
    landmarks: Vec<f32>,
    partitions: Vec<PartitionData>,
    dimension: usize,
    num_points: usize,
}

impl LandmarkIndex {
    /// Build the query-side view from an externally computed assignment.
    ///
    /// `assignments[i]` is the partition owning point `i`. Ball radii are
    /// derived from the assignment (max member-to-landmark distance), so the
    /// triangle-inequality bounds used by the scanners hold by construction.
    pub fn from_assignments(
        points: Vec<f32>,
        dimension: usize,
        landmarks: Vec<f32>,
        assignments: &[u32],
    ) -> Result<Self> {
        if dimension == 0 {
            return Err(QueryError::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if points.is_empty() {
            return Err(QueryError::EmptyIndex);
        }
        if points.len() % dimension != 0 || landmarks.len() % dimension != 0 {
            return Err(QueryError::InvalidParameter(
                "point and landmark buffers must be multiples of dimension".to_string(),
            ));
        }
        let num_points = points.len() / dimension;
        let num_partitions = landmarks.len() / dimension;
        if num_partitions == 0 {
            return Err(QueryError::InvalidParameter(
                "at least one landmark is required".to_string(),
            ));
        }
        if assignments.len() != num_points {
            return Err(QueryError::InvalidParameter(format!(
                "expected {} assignments, got {}",
                num_points,
                assignments.len()
            )));
        }

        let mut partitions = vec![
            PartitionData {
                member_ids: Vec::new(),
                radius: 0.0,
            };
            num_partitions
        ];
        for (id, &p) in assignments.iter().enumerate() {
            let p = p as usize;
            if p >= num_partitions {
                return Err(QueryError::InvalidParameter(format!(
                    "assignment {p} out of range for {num_partitions} partitions"
                )));
            }
            partitions[p].member_ids.push(id as u32);
        }

        let mut index = Self {
            points,
            landmarks,
            partitions,
            dimension,
            num_points,
        };
        for p in 0..num_partitions {
            let landmark_start = p * dimension;
            let landmark = &index.landmarks[landmark_start..landmark_start + dimension];
            let mut radius = 0.0f32;
            for &id in &index.partitions[p].member_ids {
                let start = id as usize * dimension;
                let member = &index.points[start..start + dimension];
                radius = radius.max(distance::squared_l2(landmark, member).sqrt());
            }
            index.partitions[p].radius = radius;
        }
        Ok(index)
    }

    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[inline]
    #[must_use]
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Cardinality of partition `p`.
    #[inline]
    #[must_use]
    pub fn partition_size(&self, p: u32) -> u32 {
        self.partitions[p as usize].member_ids.len() as u32
    }

    /// Member-identifier table of partition `p`.
    #[inline]
    #[must_use]
    pub fn member_ids(&self, p: u32) -> &[u32] {
        &self.partitions[p as usize].member_ids
    }

    /// Ball radius of partition `p` (unsquared).
    #[inline]
    #[must_use]
    pub fn radius(&self, p: u32) -> f32 {
        self.partitions[p as usize].radius
    }

    /// Landmark coordinates of partition `p`.
    #[inline]
    #[must_use]
    pub fn landmark(&self, p: u32) -> &[f32] {
        let start = p as usize * self.dimension;
        &self.landmarks[start..start + self.dimension]
    }

    /// Coordinates of dataset point `id` from SoA storage.
    #[inline]
    #[must_use]
    pub fn point(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.points[start..start + self.dimension]
    }

    /// Probe list covering every partition, in id order.
    ///
    /// Convenience for exact whole-index queries and for tests.
    #[must_use]
    pub fn full_probe_list(&self) -> ProbeList {
        (0..self.num_partitions() as u32).collect()
    }
}

/// Assign each point to its nearest landmark.
///
/// Index build is upstream of this crate; this helper exists so tests and
/// benchmarks can produce a valid assignment without an external builder.
pub fn nearest_landmark_assignments(
    points: &[f32],
    dimension: usize,
    landmarks: &[f32],
) -> Result<Vec<u32>> {
    if dimension == 0 || points.len() % dimension != 0 || landmarks.len() % dimension != 0 {
        return Err(QueryError::InvalidParameter(
            "buffers must be nonempty multiples of dimension".to_string(),
        ));
    }
    if landmarks.is_empty() {
        return Err(QueryError::InvalidParameter(
            "at least one landmark is required".to_string(),
        ));
    }
    let num_landmarks = landmarks.len() / dimension;
    let assignments = points
        .chunks_exact(dimension)
        .map(|point| {
            let mut best = 0u32;
            let mut best_dist = f32::INFINITY;
            for l in 0..num_landmarks {
                let start = l * dimension;
                let d = distance::squared_l2(point, &landmarks[start..start + dimension]);
                if d < best_dist {
                    best_dist = d;
                    best = l as u32;
                }
            }
            best
        })
        .collect();
    Ok(assignments)
}
