/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! The cluster engine: structural edits, undo, selection and notification.
//!
//! Every structural edit runs the same sequence on the caller's thread:
//!
//! ```text
//! validate → snapshot onto undo history → edit membership → rebuild tables → notify
//! ```
//!
//! Validation happens before anything is touched, so a call that returns an
//! error leaves the engine exactly as it was: no snapshot, no notification.
//!
//! | Operation | Undo snapshot | Notification |
//! |-----------|---------------|--------------|
//! | [`reset`](ClusterEngine::reset), [`merge`](ClusterEngine::merge), [`move_to`](ClusterEngine::move_to), [`exchange`](ClusterEngine::exchange), [`split`](ClusterEngine::split), [`delete`](ClusterEngine::delete), [`refill`](ClusterEngine::refill) | yes | `cluster` |
//! | [`fill`](ClusterEngine::fill) | yes | `cluster`, only if the array changed |
//! | [`remove`](ClusterEngine::remove) | no; history truncated in lockstep | `cluster` |
//! | [`mask`](ClusterEngine::mask) | no | `cluster` |
//! | [`undo`](ClusterEngine::undo) | pops | `cluster` |
//! | [`select`](ClusterEngine::select) | no | `select` |
//! | [`select_clu`](ClusterEngine::select_clu) | no | `select_clu` |
//!
//! The engine is `Send`. Share it between threads behind a single mutex;
//! every call already runs to completion, notification included, before it
//! returns.

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{CluError, Result};
use crate::history::UndoStack;
use crate::label::{self, Label, LabelSpec};
use crate::metadata::ClusteringInfo;
use crate::observer::{Action, EventKind, Notification, ObserverId, Observers};
use crate::partition::{without_positions, LocalIndex, Partition};

// ─── Config ───────────────────────────────────────────────────────────────────

/// Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Maximum number of undo snapshots kept. `None` keeps every one.
    /// Default: `None`.
    pub history_limit: Option<usize>,

    /// Re-compact labels to `0..k` after every edit.
    /// Default: `true`. When `false`, labels are compacted at construction
    /// only, and groups emptied by an edit leave a gap in the label set.
    pub compact_labels: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: None,
            compact_labels: true,
        }
    }
}

/// Where moved items ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Label of the destination group after the rebuild.
    pub group: Label,
    /// Positions of the moved items within the destination group, ascending.
    pub local: Vec<usize>,
}

// ─── ClusterEngine ────────────────────────────────────────────────────────────

/// A mutable partition of items into groups with undo and observers.
///
/// ```rust
/// use clu_core::{ClusterEngine, EventKind};
///
/// let mut clu = ClusterEngine::new(vec![0, 0, 1, 1, 2]).unwrap();
/// clu.on(EventKind::Cluster, |note, p| {
///     println!("{}: {} groups", note.action, p.n_groups());
/// });
/// clu.merge(&[0, 2]).unwrap();
/// assert_eq!(clu.partition().group(0).unwrap(), &[0, 1, 4]);
/// clu.undo().unwrap();
/// assert_eq!(clu.membership(), &[0, 0, 1, 1, 2]);
/// ```
#[derive(Debug)]
pub struct ClusterEngine {
    partition: Partition,
    /// Normalized membership as constructed; the base for [`Self::mask`].
    pristine: Vec<Label>,
    history: UndoStack,
    observers: Observers,
    config: EngineConfig,
    info: ClusteringInfo,
}

impl ClusterEngine {
    /// Build an engine from initial labels with the default configuration.
    pub fn new(labels: Vec<Label>) -> Result<Self> {
        Self::with_config(labels, EngineConfig::default())
    }

    /// Build an engine from initial labels.
    ///
    /// Negative labels are shifted so the minimum is zero, then labels are
    /// compacted to `0..k` by rank. Fails with [`CluError::InvalidInput`] on
    /// an empty array.
    pub fn with_config(mut labels: Vec<Label>, config: EngineConfig) -> Result<Self> {
        if labels.is_empty() {
            return Err(CluError::InvalidInput("label array is empty"));
        }
        label::shift_non_negative(&mut labels);
        let partition = Partition::from_labels(labels);
        tracing::debug!(
            items = partition.n_items(),
            groups = partition.n_groups(),
            "cluster engine constructed"
        );
        Ok(Self {
            pristine: partition.membership().to_vec(),
            partition,
            history: UndoStack::new(config.history_limit),
            observers: Observers::new(),
            config,
            info: ClusteringInfo::default(),
        })
    }

    /// Build an engine from floating-point labels, which must all be integral.
    pub fn from_float_labels(values: &[f64]) -> Result<Self> {
        Self::new(label::labels_from_f64(values)?)
    }

    /// Attach clustering artifacts. The probability matrix, if any, must have
    /// one row per item.
    pub fn with_clustering_info(mut self, mut info: ClusteringInfo) -> Result<Self> {
        if let Some(probs) = &info.probabilities {
            if probs.rows() != self.partition.n_items() {
                return Err(CluError::LengthMismatch {
                    expected: self.partition.n_items(),
                    actual: probs.rows(),
                });
            }
        }
        info.default_selection.sort_unstable();
        info.default_selection.dedup();
        self.info = info;
        Ok(self)
    }

    // ── Read access ────────────────────────────────────────────────────────

    /// Current partition and its derived tables.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Current label of every item.
    pub fn membership(&self) -> &[Label] {
        self.partition.membership()
    }

    /// Membership as it was right after construction.
    pub fn pristine(&self) -> &[Label] {
        &self.pristine
    }

    /// Undo history.
    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clustering artifacts supplied at construction.
    pub fn clustering_info(&self) -> &ClusteringInfo {
        &self.info
    }

    /// Groups the clustering suggests showing first.
    pub fn default_selection(&self) -> &[Label] {
        &self.info.default_selection
    }

    /// Override the suggested default groups.
    pub fn set_default_selection(&mut self, mut groups: Vec<Label>) {
        groups.sort_unstable();
        groups.dedup();
        self.info.default_selection = groups;
    }

    /// Whether the live membership differs from the most recent undo snapshot.
    pub fn changed(&self) -> bool {
        self.history
            .last()
            .is_some_and(|last| last != self.partition.membership())
    }

    // ── Observers ──────────────────────────────────────────────────────────

    /// Subscribe to an event. See [`Observers::on`].
    pub fn on<F>(&mut self, event: EventKind, callback: F) -> ObserverId
    where
        F: FnMut(&Notification, &Partition) + Send + 'static,
    {
        self.observers.on(event, callback)
    }

    /// Unsubscribe. Returns `false` if the id was not registered.
    pub fn off(&mut self, id: ObserverId) -> bool {
        self.observers.off(id)
    }

    // ── Structural edits ───────────────────────────────────────────────────

    /// Put every item in group 0.
    pub fn reset(&mut self) {
        self.checkpoint();
        self.partition.membership_mut().iter_mut().for_each(|l| *l = 0);
        self.commit(Action::Reset);
    }

    /// Collapse `groups` into the smallest label among them.
    ///
    /// Needs at least two labels, all present. Merging a label with itself is
    /// a no-op that still records undo and notifies.
    pub fn merge(&mut self, groups: &[Label]) -> Result<()> {
        if groups.len() < 2 {
            return Err(CluError::NotEnoughGroups { needed: 2, got: groups.len() });
        }
        self.require_groups(groups)?;
        let target = groups.iter().copied().min().unwrap_or_default();

        self.checkpoint();
        for l in self.partition.membership_mut().iter_mut() {
            if groups.contains(l) {
                *l = target;
            }
        }
        self.commit(Action::Merge);
        Ok(())
    }

    /// Move a sub-selection of one or more groups into group `to`.
    ///
    /// `from` maps source groups to local positions within them. Returns the
    /// destination's label after the rebuild (compaction may renumber it)
    /// and the moved items' positions within it.
    pub fn move_to(&mut self, from: &LocalIndex, to: Label) -> Result<MoveOutcome> {
        if to < 0 {
            return Err(CluError::InvalidInput("destination label is negative"));
        }
        let globals = self.partition.local_to_global(from)?;
        self.checkpoint();
        let outcome = self.relocate(&globals, to, Action::Move);
        self.notify_cluster(Action::Move);
        Ok(outcome)
    }

    /// Swap the labels of two groups.
    pub fn exchange(&mut self, a: Label, b: Label) -> Result<()> {
        self.require_groups(&[a, b])?;
        self.checkpoint();
        for l in self.partition.membership_mut().iter_mut() {
            if *l == a {
                *l = b;
            } else if *l == b {
                *l = a;
            }
        }
        self.commit(Action::Exchange);
        Ok(())
    }

    /// Move a sub-selection into a brand-new group labelled one past the
    /// current maximum.
    pub fn split(&mut self, from: &LocalIndex) -> Result<MoveOutcome> {
        let globals = self.partition.local_to_global(from)?;
        let fresh = match self.partition.max_label() {
            None => 0,
            Some(m) => m
                .checked_add(1)
                .ok_or(CluError::InvalidInput("no label left above the current maximum"))?,
        };
        self.checkpoint();
        let outcome = self.relocate(&globals, fresh, Action::Split);
        self.notify_cluster(Action::Split);
        Ok(outcome)
    }

    /// Physically delete slots of the membership array.
    ///
    /// Records undo, but leaves existing undo snapshots at their old length;
    /// contrast [`Self::remove`].
    pub fn delete(&mut self, positions: &[usize]) -> Result<()> {
        let positions = self.partition.checked_sorted(positions)?;
        self.checkpoint();
        let kept = without_positions(self.partition.membership(), &positions);
        *self.partition.membership_mut() = kept;
        self.partition.set_selection(Vec::new());
        self.commit(Action::Delete);
        Ok(())
    }

    /// Permanently remove items, cutting the same positions out of every
    /// undo snapshot so history stays index-compatible.
    ///
    /// Not undoable itself: deleted items cannot be brought back.
    pub fn remove(&mut self, globals: &[usize]) -> Result<()> {
        let positions = self.partition.checked_sorted(globals)?;
        let kept = without_positions(self.partition.membership(), &positions);
        *self.partition.membership_mut() = kept;
        self.history.truncate_positions(&positions);
        self.partition.set_selection(Vec::new());
        self.commit(Action::Remove);
        Ok(())
    }

    /// Restore the construction-time membership, then drop `globals` from it.
    ///
    /// Positions refer to the construction-time array. Undo history is not
    /// touched.
    pub fn mask(&mut self, globals: &[usize]) -> Result<()> {
        let n = self.pristine.len();
        if let Some(&bad) = globals.iter().find(|&&g| g >= n) {
            return Err(CluError::GlobalIndexOutOfRange { index: bad, len: n });
        }
        let mut positions = globals.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let kept = without_positions(&self.pristine, &positions);
        *self.partition.membership_mut() = kept;
        self.partition.set_selection(Vec::new());
        self.commit(Action::Mask);
        Ok(())
    }

    /// Overwrite labels directly.
    ///
    /// `targets` selects the items (all of them when `None`), in the order
    /// matched by a per-item `labels` list. Observers are only notified when
    /// the resulting membership differs from before.
    pub fn fill(&mut self, targets: Option<&[usize]>, labels: LabelSpec) -> Result<()> {
        let (targets, labels) = self.resolve_write(targets, labels)?;
        let before = self.partition.membership().to_vec();
        self.history.push(before.clone());

        let membership = self.partition.membership_mut();
        for (&g, &l) in targets.iter().zip(&labels) {
            membership[g] = l;
        }
        self.partition.rebuild(self.config.compact_labels);
        self.log_edit(Action::Fill);

        if self.partition.membership() != before.as_slice() {
            self.notify_cluster(Action::Fill);
        }
        Ok(())
    }

    /// Overwrite the labels of `targets`, then shift every label down by one
    /// if no item is left in group 0.
    pub fn refill(&mut self, targets: &[usize], labels: LabelSpec) -> Result<()> {
        let (targets, labels) = self.resolve_write(Some(targets), labels)?;
        self.checkpoint();

        let membership = self.partition.membership_mut();
        for (&g, &l) in targets.iter().zip(&labels) {
            membership[g] = l;
        }
        if membership.iter().min().is_some_and(|&m| m >= 1) {
            membership.iter_mut().for_each(|l| *l -= 1);
        }
        self.commit(Action::Refill);
        Ok(())
    }

    /// Restore the most recent undo snapshot.
    ///
    /// With an empty history the engine is left untouched and
    /// [`CluError::EmptyUndoHistory`] is returned.
    pub fn undo(&mut self) -> Result<()> {
        let Some(previous) = self.history.pop() else {
            tracing::debug!("no more undo");
            return Err(CluError::EmptyUndoHistory);
        };
        self.partition.replace(previous, self.config.compact_labels);
        self.partition.set_selection(Vec::new());
        self.log_edit(Action::Undo);
        self.notify_cluster(Action::Undo);
        Ok(())
    }

    /// Drop all undo snapshots.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // ── Selection ──────────────────────────────────────────────────────────

    /// Highlight items by global index (deduplicated and sorted).
    pub fn select(&mut self, globals: &[usize]) -> Result<()> {
        self.select_inner(globals, None)
    }

    /// Like [`Self::select`], naming the component that made the selection.
    pub fn select_by(&mut self, globals: &[usize], caller: impl Into<String>) -> Result<()> {
        self.select_inner(globals, Some(caller.into()))
    }

    /// Set which groups displays should show (deduplicated and sorted).
    pub fn select_clu(&mut self, groups: &[Label]) -> Result<()> {
        self.require_groups(groups)?;
        let mut visible = groups.to_vec();
        visible.sort_unstable();
        visible.dedup();
        self.partition.set_visible(visible);
        self.emit(EventKind::SelectClu, Action::SelectClu, None);
        Ok(())
    }

    /// Rebuild an engine from a snapshot's parts.
    #[cfg(feature = "serde")]
    pub(crate) fn restore(snapshot: crate::snapshot::PartitionSnapshot) -> Result<Self> {
        if snapshot.pristine.is_empty() || snapshot.membership.is_empty() {
            return Err(CluError::InvalidInput("label array is empty"));
        }
        let negative = snapshot
            .membership
            .iter()
            .chain(&snapshot.pristine)
            .chain(snapshot.history.iter().flatten())
            .any(|&l| l < 0);
        if negative {
            return Err(CluError::InvalidInput("labels must be non-negative"));
        }

        let mut partition = Partition::build(snapshot.membership, snapshot.config.compact_labels);
        let selection = partition.checked_sorted(&snapshot.selection)?;
        partition.set_selection(selection);
        if snapshot.history.limit() != snapshot.config.history_limit {
            return Err(CluError::InvalidInput(
                "history limit disagrees with configuration",
            ));
        }
        let mut engine = Self {
            partition,
            pristine: snapshot.pristine,
            history: snapshot.history,
            observers: Observers::new(),
            config: snapshot.config,
            info: snapshot.info,
        };
        engine.require_groups(&snapshot.visible)?;
        engine.partition.set_visible(snapshot.visible);
        Ok(engine)
    }

    // ── Internal helpers ───────────────────────────────────────────────────

    fn select_inner(&mut self, globals: &[usize], caller: Option<String>) -> Result<()> {
        let selection = self.partition.checked_sorted(globals)?;
        self.partition.set_selection(selection);
        self.emit(EventKind::Select, Action::Select, caller);
        Ok(())
    }

    fn require_groups(&self, groups: &[Label]) -> Result<()> {
        match groups.iter().find(|&&g| !self.partition.contains_group(g)) {
            Some(&missing) => Err(CluError::UnknownGroup(missing)),
            None => Ok(()),
        }
    }

    /// Check write targets and expand labels to one per target.
    fn resolve_write(
        &self,
        targets: Option<&[usize]>,
        labels: LabelSpec,
    ) -> Result<(Vec<usize>, Vec<Label>)> {
        let n = self.partition.n_items();
        let targets = match targets {
            Some(t) => {
                if let Some(&bad) = t.iter().find(|&&g| g >= n) {
                    return Err(CluError::GlobalIndexOutOfRange { index: bad, len: n });
                }
                t.to_vec()
            }
            None => (0..n).collect(),
        };
        let labels = labels.resolve(targets.len())?;
        if labels.iter().any(|&l| l < 0) {
            return Err(CluError::InvalidInput("labels must be non-negative"));
        }
        Ok((targets, labels))
    }

    /// Assign `to` to every item in `globals` and rebuild.
    fn relocate(&mut self, globals: &[usize], to: Label, action: Action) -> MoveOutcome {
        let membership = self.partition.membership_mut();
        for &g in globals {
            membership[g] = to;
        }
        self.partition.rebuild(self.config.compact_labels);

        let group = globals
            .first()
            .map_or(to, |&g| self.partition.membership()[g]);
        let local = match self.partition.group(group) {
            Ok(table) => globals
                .iter()
                .filter_map(|g| table.binary_search(g).ok())
                .collect(),
            Err(_) => Vec::new(),
        };
        self.log_edit(action);
        MoveOutcome { group, local }
    }

    fn checkpoint(&mut self) {
        self.history.push(self.partition.membership().to_vec());
    }

    /// Rebuild tables and notify `cluster` observers.
    fn commit(&mut self, action: Action) {
        self.partition.rebuild(self.config.compact_labels);
        self.log_edit(action);
        self.notify_cluster(action);
    }

    fn log_edit(&self, action: Action) {
        tracing::debug!(
            action = action.as_str(),
            items = self.partition.n_items(),
            groups = self.partition.n_groups(),
            undo_depth = self.history.len(),
            "membership rebuilt"
        );
    }

    fn notify_cluster(&mut self, action: Action) {
        self.emit(EventKind::Cluster, action, None);
    }

    fn emit(&mut self, event: EventKind, action: Action, caller: Option<String>) {
        let note = Notification { event, action, caller };
        self.observers.emit(&note, &self.partition);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Engine plus a log of every `(event, action)` it emitted.
    fn recorded(labels: Vec<Label>) -> (ClusterEngine, Arc<Mutex<Vec<(EventKind, Action)>>>) {
        let mut clu = ClusterEngine::new(labels).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::Cluster, EventKind::Select, EventKind::SelectClu] {
            let log = Arc::clone(&log);
            clu.on(kind, move |note, _| log.lock().unwrap().push((note.event, note.action)));
        }
        (clu, log)
    }

    fn local(entries: &[(Label, &[usize])]) -> LocalIndex {
        entries.iter().map(|&(g, l)| (g, l.to_vec())).collect()
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            ClusterEngine::new(vec![]).unwrap_err(),
            CluError::InvalidInput("label array is empty")
        );
    }

    #[test]
    fn negative_labels_are_shifted() {
        let clu = ClusterEngine::new(vec![-1, -1, 0, 1]).unwrap();
        assert_eq!(clu.membership(), &[0, 0, 1, 2]);
        assert_eq!(clu.pristine(), &[0, 0, 1, 2]);
    }

    #[test]
    fn extreme_labels_do_not_overflow() {
        let clu = ClusterEngine::new(vec![Label::MIN, 0]).unwrap();
        assert_eq!(clu.membership(), &[0, 1]);
        let clu = ClusterEngine::new(vec![-1, Label::MAX, -1]).unwrap();
        assert_eq!(clu.membership(), &[0, 1, 0]);
    }

    #[test]
    fn split_without_headroom_is_rejected() {
        let config = EngineConfig {
            compact_labels: false,
            ..EngineConfig::default()
        };
        let mut clu = ClusterEngine::with_config(vec![0, 1], config).unwrap();
        clu.fill(Some(&[1][..]), LabelSpec::Single(Label::MAX)).unwrap();
        let depth = clu.history().len();
        assert!(matches!(
            clu.split(&local(&[(0, &[0])])),
            Err(CluError::InvalidInput(_))
        ));
        assert_eq!(clu.membership(), &[0, Label::MAX]);
        assert_eq!(clu.history().len(), depth);
    }

    #[test]
    fn float_labels() {
        let clu = ClusterEngine::from_float_labels(&[2.0, 2.0, 7.0]).unwrap();
        assert_eq!(clu.membership(), &[0, 0, 1]);
        assert!(matches!(
            ClusterEngine::from_float_labels(&[0.5]),
            Err(CluError::NonIntegerLabel { position: 0, .. })
        ));
    }

    #[test]
    fn reset_groups_everything_and_is_undoable() {
        let (mut clu, log) = recorded(vec![0, 1, 2]);
        clu.reset();
        assert_eq!(clu.membership(), &[0, 0, 0]);
        assert_eq!(log.lock().unwrap().as_slice(), &[(EventKind::Cluster, Action::Reset)]);
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 1, 2]);
    }

    #[test]
    fn merge_into_minimum_and_recompact() {
        let mut clu = ClusterEngine::new(vec![0, 0, 1, 1, 2, 3]).unwrap();
        clu.merge(&[3, 1]).unwrap();
        // 3 → 1, leaving {0, 1, 2}
        assert_eq!(clu.membership(), &[0, 0, 1, 1, 2, 1]);
        clu.merge(&[0, 1]).unwrap();
        // {0, 2} compacts to {0, 1}
        assert_eq!(clu.membership(), &[0, 0, 0, 0, 1, 0]);
        assert_eq!(clu.partition().labels(), &[0, 1]);
    }

    #[test]
    fn merge_validates_before_touching_state() {
        let (mut clu, log) = recorded(vec![0, 1]);
        assert_eq!(clu.merge(&[0]), Err(CluError::NotEnoughGroups { needed: 2, got: 1 }));
        assert_eq!(clu.merge(&[0, 5]), Err(CluError::UnknownGroup(5)));
        assert!(clu.history().is_empty());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn self_merge_still_records_and_notifies() {
        let (mut clu, log) = recorded(vec![0, 1]);
        clu.merge(&[1, 1]).unwrap();
        assert_eq!(clu.membership(), &[0, 1]);
        assert_eq!(clu.history().len(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(!clu.changed());
    }

    #[test]
    fn move_sub_selection_across_groups() {
        let mut clu = ClusterEngine::new(vec![0, 1, 1, 2, 2, 2]).unwrap();
        // items 2 (group 1, local 1) and 5 (group 2, local 2) into group 0
        let out = clu.move_to(&local(&[(1, &[1]), (2, &[2])]), 0).unwrap();
        assert_eq!(clu.membership(), &[0, 1, 0, 2, 2, 0]);
        assert_eq!(out, MoveOutcome { group: 0, local: vec![1, 2] });
    }

    #[test]
    fn move_reports_renumbered_destination() {
        let mut clu = ClusterEngine::new(vec![0, 1, 2]).unwrap();
        // emptying group 1 shifts group 2 down to 1
        let out = clu.move_to(&local(&[(1, &[0])]), 2).unwrap();
        assert_eq!(clu.membership(), &[0, 1, 1]);
        assert_eq!(out, MoveOutcome { group: 1, local: vec![0, 1] });
    }

    #[test]
    fn move_rejects_bad_local_index() {
        let mut clu = ClusterEngine::new(vec![0, 1]).unwrap();
        assert_eq!(
            clu.move_to(&local(&[(1, &[3])]), 0),
            Err(CluError::LocalIndexOutOfRange { group: 1, index: 3, len: 1 })
        );
        assert!(clu.history().is_empty());
    }

    #[test]
    fn exchange_swaps_labels_not_items() {
        let mut clu = ClusterEngine::new(vec![0, 0, 1, 2]).unwrap();
        clu.exchange(0, 2).unwrap();
        assert_eq!(clu.membership(), &[2, 2, 1, 0]);
        assert_eq!(clu.partition().count(2), 2);
        clu.exchange(1, 1).unwrap();
        assert_eq!(clu.membership(), &[2, 2, 1, 0]);
        assert_eq!(clu.exchange(0, 9), Err(CluError::UnknownGroup(9)));
    }

    #[test]
    fn split_creates_fresh_group_with_one_undo_entry() {
        let (mut clu, log) = recorded(vec![0, 0, 0, 1]);
        let out = clu.split(&local(&[(0, &[0, 2])])).unwrap();
        assert_eq!(clu.membership(), &[2, 0, 2, 1]);
        assert_eq!(out, MoveOutcome { group: 2, local: vec![0, 1] });
        assert_eq!(clu.history().len(), 1);
        assert_eq!(log.lock().unwrap().as_slice(), &[(EventKind::Cluster, Action::Split)]);
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 0, 0, 1]);
    }

    #[test]
    fn delete_keeps_old_snapshot_lengths() {
        let mut clu = ClusterEngine::new(vec![0, 1, 0, 1]).unwrap();
        clu.merge(&[0, 1]).unwrap();
        clu.delete(&[3, 0]).unwrap();
        assert_eq!(clu.membership(), &[0, 0]);
        let lens: Vec<usize> = clu.history().iter().map(<[Label]>::len).collect();
        assert_eq!(lens, vec![4, 4]);
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 0, 0, 0]);
    }

    #[test]
    fn remove_truncates_history_in_lockstep() {
        let mut clu = ClusterEngine::new(vec![0, 1, 2, 0, 1]).unwrap();
        clu.merge(&[0, 2]).unwrap();
        clu.reset();
        clu.remove(&[1, 4]).unwrap();
        assert_eq!(clu.membership(), &[0, 0, 0]);
        assert_eq!(clu.history().len(), 2);
        assert!(clu.history().iter().all(|s| s.len() == 3));
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 0, 0]);
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 1, 0]);
    }

    #[test]
    fn mask_restores_pristine_minus_items() {
        let mut clu = ClusterEngine::new(vec![0, 1, 2, 2]).unwrap();
        clu.reset();
        clu.mask(&[1]).unwrap();
        assert_eq!(clu.membership(), &[0, 1, 1]);
        assert_eq!(clu.history().len(), 1);
        assert_eq!(
            clu.mask(&[4]),
            Err(CluError::GlobalIndexOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn fill_broadcasts_and_skips_no_op_notification() {
        let (mut clu, log) = recorded(vec![0, 0, 1, 1]);
        clu.fill(Some(&[0][..]), LabelSpec::Single(1)).unwrap();
        assert_eq!(clu.membership(), &[1, 0, 1, 1]);
        assert_eq!(log.lock().unwrap().len(), 1);

        clu.fill(Some(&[0][..]), LabelSpec::Single(1)).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1, "unchanged fill must not notify");
        assert_eq!(clu.history().len(), 2);
    }

    #[test]
    fn fill_all_with_per_item_labels() {
        let mut clu = ClusterEngine::new(vec![0, 0, 0]).unwrap();
        clu.fill(None, LabelSpec::PerItem(vec![2, 0, 2])).unwrap();
        assert_eq!(clu.membership(), &[1, 0, 1]);
        assert_eq!(
            clu.fill(None, LabelSpec::PerItem(vec![1, 1])),
            Err(CluError::LengthMismatch { expected: 3, actual: 2 })
        );
        assert_eq!(
            clu.fill(None, LabelSpec::Single(-1)),
            Err(CluError::InvalidInput("labels must be non-negative"))
        );
    }

    #[test]
    fn refill_shifts_down_when_group_zero_empties() {
        let mut clu = ClusterEngine::with_config(
            vec![0, 1, 1],
            EngineConfig { compact_labels: false, ..EngineConfig::default() },
        )
        .unwrap();
        clu.refill(&[0], LabelSpec::Single(2)).unwrap();
        assert_eq!(clu.membership(), &[1, 0, 0]);
        assert_eq!(clu.history().len(), 1);
    }

    #[test]
    fn undo_on_empty_history_is_reported_not_fatal() {
        let (mut clu, log) = recorded(vec![0, 1]);
        assert_eq!(clu.undo(), Err(CluError::EmptyUndoHistory));
        assert_eq!(clu.membership(), &[0, 1]);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn undo_clears_selection() {
        let mut clu = ClusterEngine::new(vec![0, 1]).unwrap();
        clu.reset();
        clu.select(&[1]).unwrap();
        clu.undo().unwrap();
        assert!(clu.partition().selection().is_empty());
    }

    #[test]
    fn history_limit_bounds_undo_depth() {
        let mut clu = ClusterEngine::with_config(
            vec![0, 1, 2],
            EngineConfig { history_limit: Some(1), ..EngineConfig::default() },
        )
        .unwrap();
        clu.merge(&[0, 1]).unwrap();
        clu.reset();
        assert_eq!(clu.history().len(), 1);
        clu.undo().unwrap();
        assert_eq!(clu.membership(), &[0, 0, 1]);
        assert_eq!(clu.undo(), Err(CluError::EmptyUndoHistory));
    }

    #[test]
    fn without_compaction_emptied_groups_leave_gaps() {
        let mut clu = ClusterEngine::with_config(
            vec![0, 1, 2],
            EngineConfig { compact_labels: false, ..EngineConfig::default() },
        )
        .unwrap();
        clu.move_to(&local(&[(1, &[0])]), 0).unwrap();
        assert_eq!(clu.partition().labels(), &[0, 2]);
        assert_eq!(clu.partition().count(1), 0);
    }

    #[test]
    fn select_clu_sorts_and_checks_groups() {
        let (mut clu, log) = recorded(vec![0, 1, 2]);
        clu.select_clu(&[2, 0, 2]).unwrap();
        assert_eq!(clu.partition().visible_groups(), &[0, 2]);
        assert_eq!(clu.select_clu(&[3]), Err(CluError::UnknownGroup(3)));
        assert_eq!(log.lock().unwrap().as_slice(), &[(EventKind::SelectClu, Action::SelectClu)]);
        // a rebuild shows everything again
        clu.reset();
        assert_eq!(clu.partition().visible_groups(), &[0]);
    }

    #[test]
    fn select_by_forwards_caller() {
        let mut clu = ClusterEngine::new(vec![0, 1]).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let s = Arc::clone(&seen);
        clu.on(EventKind::Select, move |note, _| *s.lock().unwrap() = note.caller.clone());
        clu.select_by(&[1], "raster_view").unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("raster_view"));
    }

    #[test]
    fn observers_see_committed_state() {
        let mut clu = ClusterEngine::new(vec![0, 1, 1]).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        clu.on(EventKind::Cluster, move |_, p| *s.lock().unwrap() = p.membership().to_vec());
        clu.merge(&[0, 1]).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn clustering_info_is_validated_and_kept() {
        use crate::metadata::ProbabilityMatrix;
        let info = ClusteringInfo {
            default_selection: vec![1, 0],
            probabilities: Some(ProbabilityMatrix::new(2, 1, vec![1.0, 1.0]).unwrap()),
            ..ClusteringInfo::default()
        };
        let clu = ClusterEngine::new(vec![0, 1]).unwrap().with_clustering_info(info).unwrap();
        assert_eq!(clu.default_selection(), &[0, 1]);

        let bad = ClusteringInfo {
            probabilities: Some(ProbabilityMatrix::new(3, 1, vec![1.0; 3]).unwrap()),
            ..ClusteringInfo::default()
        };
        assert!(ClusterEngine::new(vec![0, 1]).unwrap().with_clustering_info(bad).is_err());
    }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ClusterEngine>();
    }
}
