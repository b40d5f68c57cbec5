//! Row-major buffer views for data crossing the query boundary.
//!
//! All per-query tables (chunk tables, result slots, adjacency rows,
//! landmark-distance tables) are stored query-major: row `q` is the
//! contiguous slice belonging to query `q`. Extents are validated at
//! construction, so a [`Grid`] handed to a scan stage is known to address
//! `rows * cols` elements with no hidden padding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed buffer extents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Buffer length does not match the declared extents.
    #[error("extent mismatch: {rows} x {cols} grid over buffer of length {len}")]
    ExtentMismatch {
        rows: usize,
        cols: usize,
        len: usize,
    },
}

/// Owned row-major matrix.
///
/// Rows are contiguous; `row(q)` is exclusively owned by query `q` for the
/// lifetime of a batch, which is what makes per-row parallel writes safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Grid<T> {
    /// Wrap an existing buffer, validating extents.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self, LayoutError> {
        if data.len() != rows * cols {
            return Err(LayoutError::ExtentMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row `i` as a contiguous slice.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[T] {
        let start = i * self.cols;
        &self.data[start..start + self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let start = i * self.cols;
        &mut self.data[start..start + self.cols]
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Clone> Grid<T> {
    /// Allocate a grid with every element set to `fill`.
    pub fn filled(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            data: vec![fill; rows * cols],
            rows,
            cols,
        }
    }
}
