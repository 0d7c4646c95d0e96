/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Undo history of prior membership arrays.
//!
//! Snapshots are pushed immediately before an edit is applied and popped to
//! restore it. The most recent snapshot is last.
//!
//! Permanent deletion of items ([`UndoStack::truncate_positions`]) is applied
//! to every stored snapshot in lockstep with the live array, so stored
//! snapshots stay index-compatible with it. Such snapshots are no longer exact
//! copies of the past; they are the past with the deleted items cut out.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::label::Label;
use crate::partition::without_positions;

/// Bounded stack of membership snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UndoStack {
    entries: VecDeque<Vec<Label>>,
    /// Maximum depth; `None` for unbounded.
    limit: Option<usize>,
}

impl UndoStack {
    /// An empty history holding at most `limit` snapshots.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Push a snapshot, evicting the oldest one if the limit is reached.
    pub fn push(&mut self, snapshot: Vec<Label>) {
        if self.limit == Some(0) {
            return;
        }
        if let Some(limit) = self.limit {
            while self.entries.len() >= limit {
                self.entries.pop_front();
                tracing::warn!(limit, "undo history full, oldest snapshot dropped");
            }
        }
        self.entries.push_back(snapshot);
    }

    /// Pop the most recent snapshot.
    pub fn pop(&mut self) -> Option<Vec<Label>> {
        self.entries.pop_back()
    }

    /// The most recent snapshot without removing it.
    pub fn last(&self) -> Option<&[Label]> {
        self.entries.back().map(Vec::as_slice)
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured maximum depth.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Stored snapshots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &[Label]> {
        self.entries.iter().map(Vec::as_slice)
    }

    /// Cut the given positions out of every stored snapshot.
    ///
    /// `positions` must be ascending and distinct. A snapshot shorter than a
    /// position simply has nothing to cut there. A snapshot left with no items
    /// is dropped, since an empty membership can never be restored.
    pub fn truncate_positions(&mut self, positions: &[usize]) {
        for entry in self.entries.iter_mut() {
            *entry = without_positions(entry, positions);
        }
        self.entries.retain(|entry| !entry.is_empty());
    }

    /// Drop every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
