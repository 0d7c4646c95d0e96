/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Error taxonomy for the partition engine.
//!
//! Contract violations are returned before any state is touched: a failed
//! call never pushes an undo entry and never notifies observers.

use alloc::vec::Vec;

use crate::label::Label;

/// Everything that can go wrong when building or editing a partition.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CluError {
    /// Malformed construction or call arguments.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// A floating-point label that is not integer-valued.
    #[error("label {value} at position {position} is not integer-valued")]
    NonIntegerLabel {
        /// Position of the offending label in the input array.
        position: usize,
        /// The offending value.
        value: f64,
    },

    /// Two parallel inputs disagree in length.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Length required by the call.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A lookup required all indices to live in one group but they span several.
    #[error("indices span more than one group: {groups:?}")]
    AmbiguousIndex {
        /// The groups the indices were found in, ascending.
        groups: Vec<Label>,
    },

    /// A group label that is not present in the current label set.
    #[error("group {0} does not exist")]
    UnknownGroup(Label),

    /// A local position past the end of its group's index table.
    #[error("local index {index} out of range for group {group} of size {len}")]
    LocalIndexOutOfRange {
        /// The group addressed.
        group: Label,
        /// The offending local position.
        index: usize,
        /// Size of the group.
        len: usize,
    },

    /// A global index past the end of the membership array.
    #[error("global index {index} out of range for {len} items")]
    GlobalIndexOutOfRange {
        /// The offending global index.
        index: usize,
        /// Number of items in the membership array.
        len: usize,
    },

    /// `undo` was called with an empty history.
    #[error("nothing to undo")]
    EmptyUndoHistory,

    /// An operation that needs several groups received too few.
    #[error("need at least {needed} groups, got {got}")]
    NotEnoughGroups {
        /// Minimum number of groups required.
        needed: usize,
        /// Number supplied.
        got: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CluError>;
