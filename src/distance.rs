//! Distance metrics and final distance normalization.
//!
//! The partition scanners operate on *raw* scores: squared L2 for both the
//! Euclidean and squared-Euclidean user metrics (one representation serves
//! both, and it keeps the hot loop free of square roots). Raw scores become
//! user-facing distances only in [`finalize_distances`], which also applies
//! the caller's scale factor when inputs were pre-scaled.

use crate::error::{QueryError, Result};
use crate::simd;
use serde::{Deserialize, Serialize};

/// Distance metric for user-facing results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Squared Euclidean (L2) distance.
    SquaredL2,
    /// Euclidean (L2) distance.
    L2,
    /// Inner-product similarity treated as a distance (negated).
    InnerProduct,
    /// Cosine distance. Not supported by the landmark scanners or the
    /// postprocessor; present so misconfiguration fails explicitly.
    Cosine,
}

impl DistanceMetric {
    /// Whether the triangle inequality holds for this metric, which is what
    /// the landmark pruning bounds require.
    #[inline]
    #[must_use]
    pub fn is_metric_space(self) -> bool {
        matches!(self, DistanceMetric::SquaredL2 | DistanceMetric::L2)
    }
}

/// Raw squared-L2 score between a query point and a dataset point.
///
/// If dimensions mismatch, this returns `f32::INFINITY` (so the pair is
/// never selected as a nearest neighbor).
#[inline]
#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    simd::l2_distance_squared(a, b)
}

/// Convert raw scanner scores into final, metric-correct distances.
///
/// `scale` is the factor the input coordinates were divided by before
/// scanning; pass `1.0` for unscaled data. Unfilled result slots carry
/// `f32::MAX` raw scores; the transforms map them far beyond any real
/// distance, but callers should identify unfilled slots by the identifier
/// sentinel, not by distance magnitude.
///
/// Unsupported metrics are a fatal configuration error: the whole call
/// fails, nothing is silently substituted.
pub fn finalize_distances(raw: &[f32], metric: DistanceMetric, scale: f32) -> Result<Vec<f32>> {
    match metric {
        DistanceMetric::SquaredL2 => {
            let s2 = scale * scale;
            Ok(raw.iter().map(|&r| r * s2).collect())
        }
        DistanceMetric::L2 => Ok(raw.iter().map(|&r| r.sqrt() * scale).collect()),
        DistanceMetric::InnerProduct => {
            let s2 = scale * scale;
            Ok(raw.iter().map(|&r| r * -s2).collect())
        }
        other => Err(QueryError::UnsupportedMetric(other)),
    }
}
