// wellmatrix - core/matrix.rs
//
// Rectangular, NaN-padded observations x groups matrix.
// Core layer: pure data, no I/O.

use crate::util::error::EmptyResultError;
use serde::Serialize;

/// Observations (rows) by groups (columns). Stored column-major; every
/// column has the same length and missing cells hold NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationMatrix {
    group_names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl AggregationMatrix {
    /// Assemble the matrix from per-group value lists, in the given order.
    ///
    /// Row count is the longest list; shorter columns are NaN-padded. Raw
    /// values of exactly zero are stored as NaN: the upstream measurement
    /// convention writes 0 for "no measurement".
    ///
    /// Fails when there are no groups or when every list is empty.
    pub fn build(group_values: &[(String, Vec<f64>)]) -> Result<Self, EmptyResultError> {
        if group_values.is_empty() {
            return Err(EmptyResultError::NoValues { groups: 0 });
        }

        let rows = group_values.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        if rows == 0 {
            return Err(EmptyResultError::NoValues {
                groups: group_values.len(),
            });
        }

        let columns = group_values
            .iter()
            .map(|(_, values)| {
                let mut column = vec![f64::NAN; rows];
                for (cell, &v) in column.iter_mut().zip(values) {
                    *cell = if v == 0.0 { f64::NAN } else { v };
                }
                column
            })
            .collect();

        tracing::debug!(rows, cols = group_values.len(), "Matrix assembled");

        Ok(Self {
            group_names: group_values.iter().map(|(n, _)| n.clone()).collect(),
            columns,
        })
    }

    /// Number of observation rows.
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Number of group columns.
    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.columns.get(col).and_then(|c| c.get(row)).copied()
    }

    pub fn column(&self, col: usize) -> Option<&[f64]> {
        self.columns.get(col).map(Vec::as_slice)
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    /// Mutable column access for in-place post-processing. Lengths cannot
    /// be changed through a slice.
    pub fn columns_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.columns.iter_mut().map(Vec::as_mut_slice)
    }

    /// Values of one observation across all groups.
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        if row >= self.rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[row]).collect())
    }
}
