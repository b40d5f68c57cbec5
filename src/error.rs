//! Error types for batched queries.

use crate::distance::DistanceMetric;
use crate::layout::LayoutError;
use std::fmt;

/// Error type for batched nearest-neighbor queries.
///
/// Every variant is a configuration error in the sense of the query contract:
/// it aborts the whole call. Data insufficiency (fewer candidates than `k`,
/// radius rows with zero neighbors) is *not* an error and is reported through
/// sentinel identifiers and zero degrees instead.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Index contains no points.
    EmptyIndex,
    /// Query buffer length is not a multiple of the index dimension.
    DimensionMismatch { query_len: usize, index_dim: usize },
    /// Invalid parameter value.
    InvalidParameter(String),
    /// Metric not supported by the requested operation.
    UnsupportedMetric(DistanceMetric),
    /// Malformed buffer extents.
    Layout(LayoutError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::EmptyIndex => write!(f, "Index is empty"),
            QueryError::DimensionMismatch {
                query_len,
                index_dim,
            } => write!(
                f,
                "Dimension mismatch: query buffer of length {query_len} is not a multiple of index dimension {index_dim}",
            ),
            QueryError::InvalidParameter(msg) => write!(f, "Invalid parameter: {msg}"),
            QueryError::UnsupportedMetric(metric) => {
                write!(f, "Metric {metric:?} is not supported by this operation")
            }
            QueryError::Layout(err) => write!(f, "Layout error: {err}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<LayoutError> for QueryError {
    fn from(err: LayoutError) -> Self {
        QueryError::Layout(err)
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
