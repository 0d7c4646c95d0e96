/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Artifacts a clustering algorithm may hand over with its initial labels.
//!
//! The engine stores these at construction and returns them on request; it
//! never interprets or edits them.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{CluError, Result};
use crate::label::Label;

/// One edge of a density-based clustering's condensed tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CondensedTreeEdge {
    /// Parent cluster node.
    pub parent: i64,
    /// Child node (a cluster or a single point).
    pub child: i64,
    /// Density level at which the child separated from the parent.
    pub lambda: f64,
    /// Number of points under the child.
    pub child_size: usize,
}

/// Row-major per-item group membership probabilities.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProbabilityMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl ProbabilityMatrix {
    /// Wrap `data` as a `rows × cols` matrix.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(CluError::LengthMismatch {
                expected: rows.saturating_mul(cols),
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows (items).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (groups).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// One item's probabilities.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.rows).then(|| &self.data[i * self.cols..(i + 1) * self.cols])
    }
}

/// Everything a clustering run supplied besides the labels.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusteringInfo {
    /// Name of the algorithm that produced the labels.
    pub method: Option<String>,
    /// Groups the algorithm suggests showing first, ascending.
    pub default_selection: Vec<Label>,
    /// Condensed tree, if the algorithm builds one.
    pub condensed_tree: Vec<CondensedTreeEdge>,
    /// Soft assignments, if the algorithm produces them.
    pub probabilities: Option<ProbabilityMatrix>,
}

impl ClusteringInfo {
    /// Info carrying only a default selection (sorted on the way in).
    pub fn with_default_selection(mut default_selection: Vec<Label>) -> Self {
        default_selection.sort_unstable();
        default_selection.dedup();
        Self {
            default_selection,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_matrix_checks_shape() {
        assert!(ProbabilityMatrix::new(2, 3, vec![0.0; 5]).is_err());
        let m = ProbabilityMatrix::new(2, 2, vec![0.9, 0.1, 0.2, 0.8]).unwrap();
        assert_eq!(m.row(1), Some(&[0.2, 0.8][..]));
        assert_eq!(m.row(2), None);
    }

    #[test]
    fn default_selection_is_sorted() {
        let info = ClusteringInfo::with_default_selection(vec![3, 1, 3]);
        assert_eq!(info.default_selection, vec![1, 3]);
    }
}
