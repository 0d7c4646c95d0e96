/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Group labels and label normalization.
//!
//! A label is a plain integer. It is not a stable identity: any rebuild may
//! renumber labels so the label set stays `{0, 1, …, k-1}`.
//!
//! # Normalization
//!
//! ```text
//! [-2, -2, 0, 3]   shift   → [0, 0, 2, 5]
//! [0, 0, 2, 5]     compact → [0, 0, 1, 2]    (label → rank in sorted unique set)
//! ```
//!
//! Shifting preserves grouping exactly. Compaction preserves grouping and the
//! relative order of labels.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{CluError, Result};

/// Integer group label.
pub type Label = i64;

/// Target label(s) for a write: one label broadcast to every item, or one label per item.
///
/// Resolved once at the call boundary by [`LabelSpec::resolve`] into a uniform
/// per-item list.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LabelSpec {
    /// The same label for every addressed item.
    Single(Label),
    /// One label per addressed item, in order.
    PerItem(Vec<Label>),
}

impl LabelSpec {
    /// Expand into exactly `n` labels.
    ///
    /// Fails with [`CluError::LengthMismatch`] when a per-item list does not
    /// have `n` entries.
    pub fn resolve(self, n: usize) -> Result<Vec<Label>> {
        match self {
            Self::Single(label) => Ok(vec![label; n]),
            Self::PerItem(labels) if labels.len() == n => Ok(labels),
            Self::PerItem(labels) => Err(CluError::LengthMismatch {
                expected: n,
                actual: labels.len(),
            }),
        }
    }
}

impl From<Label> for LabelSpec {
    fn from(label: Label) -> Self {
        Self::Single(label)
    }
}

impl From<Vec<Label>> for LabelSpec {
    fn from(labels: Vec<Label>) -> Self {
        Self::PerItem(labels)
    }
}

impl From<&[Label]> for LabelSpec {
    fn from(labels: &[Label]) -> Self {
        Self::PerItem(labels.to_vec())
    }
}

/// Shift every label by a constant so the minimum becomes zero.
///
/// Only applied when some label is negative. When the shift would overflow
/// (a minimum of `i64::MIN`, or labels spanning more than `i64::MAX`) the
/// labels are compacted by rank instead, which keeps grouping and order.
pub fn shift_non_negative(labels: &mut [Label]) {
    let min = match labels.iter().min() {
        Some(&m) if m < 0 => m,
        _ => return,
    };
    let offset = min
        .checked_neg()
        .filter(|&off| labels.iter().all(|l| l.checked_add(off).is_some()));
    match offset {
        Some(off) => labels.iter_mut().for_each(|l| *l += off),
        None => {
            let ids = sorted_unique(labels);
            compact(labels, &ids);
        }
    }
}

/// Sorted set of distinct labels.
pub fn sorted_unique(labels: &[Label]) -> Vec<Label> {
    let mut ids = labels.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// `true` when a sorted unique label set is exactly `{0, 1, …, k-1}`.
pub fn is_contiguous(ids: &[Label]) -> bool {
    match ids.first() {
        None => true,
        Some(&first) => first == 0 && ids.windows(2).all(|w| w[0].checked_add(1) == Some(w[1])),
    }
}

/// Relabel every item to the rank of its label within `ids`.
///
/// `ids` must be the sorted unique label set of `labels`.
pub fn compact(labels: &mut [Label], ids: &[Label]) {
    for l in labels.iter_mut() {
        // every label is in `ids` by construction
        if let Ok(rank) = ids.binary_search(l) {
            *l = rank as Label;
        }
    }
}

/// `2^63`, the first float past `i64::MAX`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Convert floating-point labels, rejecting non-finite, fractional or
/// out-of-range values.
pub fn labels_from_f64(values: &[f64]) -> Result<Vec<Label>> {
    values
        .iter()
        .enumerate()
        .map(|(position, &value)| {
            let label = value as Label;
            let in_range = (-I64_LIMIT..I64_LIMIT).contains(&value);
            if in_range && label as f64 == value {
                Ok(label)
            } else {
                Err(CluError::NonIntegerLabel { position, value })
            }
        })
        .collect()
}
