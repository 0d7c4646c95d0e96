/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The membership array and every table derived from it.
//!
//! A [`Partition`] assigns each item (by global index) to exactly one group.
//! The per-group index tables, counts and the cumulative-count offsets are
//! never patched: [`Partition::rebuild`] recomputes all of them from the
//! membership array after every structural edit.
//!
//! # Index spaces
//!
//! ```text
//! membership   [0, 1, 0, 2, 1, 0]
//! global       0  1  2  3  4  5
//!
//! group 0 → [0, 2, 5]     local 0, 1, 2
//! group 1 → [1, 4]        local 0, 1
//! group 2 → [3]           local 0
//!
//! cumulative   [0, 3, 5, 6]
//! ```
//!
//! # Invariants
//!
//! - Every global index in `0..n_items` appears in exactly one group table.
//! - Group tables are ascending; empty groups are never present.
//! - The cumulative table starts at 0, never decreases, and ends at `n_items`.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crate::error::{CluError, Result};
use crate::label::{self, Label};

/// Local positions keyed by group: `{group: [local, …]}`.
pub type LocalIndex = BTreeMap<Label, Vec<usize>>;

/// Membership array plus derived group tables and selection state.
///
/// Read-only to everyone but the engine; observers receive `&Partition`
/// alongside each notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    membership: Vec<Label>,
    /// Sorted distinct labels.
    ids: Vec<Label>,
    /// Ascending global indices per group.
    index: BTreeMap<Label, Vec<usize>>,
    /// `cumsum[i]` = number of items in groups `ids[..i]`.
    cumsum: Vec<usize>,
    /// Highlighted items, ascending and distinct.
    selection: Vec<usize>,
    /// Groups currently shown by displays, ascending.
    visible: Vec<Label>,
}

impl Partition {
    /// Build a partition from a non-negative label array, compacting labels to `0..k`.
    pub(crate) fn from_labels(membership: Vec<Label>) -> Self {
        Self::build(membership, true)
    }

    /// Build a partition, compacting labels only if `compact` is set.
    pub(crate) fn build(membership: Vec<Label>, compact: bool) -> Self {
        let mut p = Self {
            membership,
            ids: Vec::new(),
            index: BTreeMap::new(),
            cumsum: Vec::new(),
            selection: Vec::new(),
            visible: Vec::new(),
        };
        p.rebuild(compact);
        p
    }

    /// Recompute labels, group tables, counts and offsets from the membership array.
    ///
    /// With `compact`, a label set that is not exactly `0..k` is relabelled
    /// in place by rank first. Visible groups reset to all groups.
    pub(crate) fn rebuild(&mut self, compact: bool) {
        let mut ids = label::sorted_unique(&self.membership);
        if compact && !label::is_contiguous(&ids) {
            label::compact(&mut self.membership, &ids);
            ids = (0..ids.len() as Label).collect();
        }

        let mut index: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
        for (global, &l) in self.membership.iter().enumerate() {
            index.entry(l).or_default().push(global);
        }

        let mut cumsum = Vec::with_capacity(ids.len() + 1);
        cumsum.push(0);
        let mut total = 0;
        for table in index.values() {
            total += table.len();
            cumsum.push(total);
        }

        self.visible = ids.clone();
        self.ids = ids;
        self.index = index;
        self.cumsum = cumsum;
    }

    /// Replace the membership array wholesale and rebuild.
    pub(crate) fn replace(&mut self, membership: Vec<Label>, compact: bool) {
        self.membership = membership;
        self.rebuild(compact);
    }

    pub(crate) fn membership_mut(&mut self) -> &mut Vec<Label> {
        &mut self.membership
    }

    pub(crate) fn set_selection(&mut self, selection: Vec<usize>) {
        self.selection = selection;
    }

    pub(crate) fn set_visible(&mut self, visible: Vec<Label>) {
        self.visible = visible;
    }

    // ── Size queries ───────────────────────────────────────────────────────

    /// The label of every item, by global index.
    pub fn membership(&self) -> &[Label] {
        &self.membership
    }

    /// Number of items.
    pub fn n_items(&self) -> usize {
        self.membership.len()
    }

    /// Number of (non-empty) groups.
    pub fn n_groups(&self) -> usize {
        self.ids.len()
    }

    /// Sorted distinct labels.
    pub fn labels(&self) -> &[Label] {
        &self.ids
    }

    /// Largest label in use, `None` for an empty partition.
    pub fn max_label(&self) -> Option<Label> {
        self.ids.last().copied()
    }

    /// Whether `group` currently has any items.
    pub fn contains_group(&self, group: Label) -> bool {
        self.index.contains_key(&group)
    }

    /// Label of the item at `global`.
    pub fn label_of(&self, global: usize) -> Result<Label> {
        self.membership
            .get(global)
            .copied()
            .ok_or(CluError::GlobalIndexOutOfRange {
                index: global,
                len: self.membership.len(),
            })
    }

    // ── Group tables ───────────────────────────────────────────────────────

    /// Ascending global indices of every item in `group`.
    pub fn group(&self, group: Label) -> Result<&[usize]> {
        self.index
            .get(&group)
            .map(Vec::as_slice)
            .ok_or(CluError::UnknownGroup(group))
    }

    /// Number of items in `group` (0 if it does not exist).
    pub fn count(&self, group: Label) -> usize {
        self.index.get(&group).map_or(0, Vec::len)
    }

    /// `(label, count)` for every group, ascending by label.
    pub fn counts(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
        self.index.iter().map(|(&l, table)| (l, table.len()))
    }

    /// Prefix sum of group sizes with a leading zero; last entry is `n_items`.
    pub fn cumulative_counts(&self) -> &[usize] {
        &self.cumsum
    }

    /// Number of items in all groups with a smaller label than `group`.
    pub fn offset_of(&self, group: Label) -> Option<usize> {
        self.ids
            .binary_search(&group)
            .ok()
            .map(|rank| self.cumsum[rank])
    }

    // ── Selection state ────────────────────────────────────────────────────

    /// Highlighted global indices, ascending and distinct.
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Groups currently visible to displays, ascending.
    pub fn visible_groups(&self) -> &[Label] {
        &self.visible
    }

    // ── Global ↔ local translation ─────────────────────────────────────────

    /// Positions of the given items within their own groups' tables.
    ///
    /// Duplicates are ignored; each group's positions are ascending. When all
    /// items fall in one group the positions are found by direct search in
    /// that table, otherwise every touched table is intersected with the
    /// input. Both paths produce the same result.
    pub fn global_to_local(&self, globals: &[usize]) -> Result<LocalIndex> {
        let globals = self.checked_sorted(globals)?;
        let mut local = LocalIndex::new();
        let Some(&first) = globals.first() else {
            return Ok(local);
        };

        let first_label = self.membership[first];
        if globals.iter().all(|&g| self.membership[g] == first_label) {
            let table = &self.index[&first_label];
            let positions = globals
                .iter()
                .filter_map(|g| table.binary_search(g).ok())
                .collect();
            local.insert(first_label, positions);
            return Ok(local);
        }

        let touched = label::sorted_unique(
            &globals.iter().map(|&g| self.membership[g]).collect::<Vec<_>>(),
        );
        for l in touched {
            local.insert(l, intersect_positions(&self.index[&l], &globals));
        }
        Ok(local)
    }

    /// Global indices addressed by `{group: [local, …]}`, ascending and distinct.
    pub fn local_to_global(&self, local: &LocalIndex) -> Result<Vec<usize>> {
        let mut globals = Vec::new();
        for (&group, positions) in local {
            globals.extend(self.group_global(group, positions)?);
        }
        globals.sort_unstable();
        globals.dedup();
        Ok(globals)
    }

    /// Global indices of a local subset of one group, ascending.
    pub fn group_global(&self, group: Label, local: &[usize]) -> Result<Vec<usize>> {
        let table = self.group(group)?;
        let mut globals = local
            .iter()
            .map(|&i| {
                table.get(i).copied().ok_or(CluError::LocalIndexOutOfRange {
                    group,
                    index: i,
                    len: table.len(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        globals.sort_unstable();
        Ok(globals)
    }

    /// The single group holding every given item, with their local positions.
    ///
    /// Fails with [`CluError::AmbiguousIndex`] when the items span several
    /// groups.
    pub fn sole_group(&self, globals: &[usize]) -> Result<(Label, Vec<usize>)> {
        let mut local = self.global_to_local(globals)?;
        match local.len() {
            0 => Err(CluError::InvalidInput("no indices given")),
            1 => Ok(local.pop_first().unwrap_or_default()),
            _ => Err(CluError::AmbiguousIndex {
                groups: local.into_keys().collect(),
            }),
        }
    }

    /// Sort and dedup global indices, checking every one is in range.
    pub(crate) fn checked_sorted(&self, globals: &[usize]) -> Result<Vec<usize>> {
        let n = self.membership.len();
        if let Some(&bad) = globals.iter().find(|&&g| g >= n) {
            return Err(CluError::GlobalIndexOutOfRange { index: bad, len: n });
        }
        let mut sorted = globals.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        Ok(sorted)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} items in {} groups", self.n_items(), self.n_groups())?;
        for (l, n) in self.counts() {
            write!(f, "\n  group {l}: {n}")?;
        }
        Ok(())
    }
}

/// Positions within `table` of the entries also present in `sorted`.
///
/// Both slices must be ascending.
fn intersect_positions(table: &[usize], sorted: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < table.len() && j < sorted.len() {
        match table[i].cmp(&sorted[j]) {
            core::cmp::Ordering::Less => i += 1,
            core::cmp::Ordering::Greater => j += 1,
            core::cmp::Ordering::Equal => {
                out.push(i);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Copy of `items` without the given positions.
///
/// `positions` must be ascending and distinct; positions past the end are ignored.
pub(crate) fn without_positions<T: Copy>(items: &[T], positions: &[usize]) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len().saturating_sub(positions.len()));
    let mut skip = positions.iter().peekable();
    for (i, &item) in items.iter().enumerate() {
        if skip.peek() == Some(&&i) {
            skip.next();
            continue;
        }
        out.push(item);
    }
    out
}
