/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! View-index translation for displays that draw groups end to end.
//!
//! A scatter or raster display shows the visible groups one after another:
//!
//! ```text
//! view index   0 1 2 | 3 4 | 5
//!              group 0 | group 2 | group 3      (group 1 hidden)
//! ```
//!
//! Highlighting a selection made elsewhere needs global → view indices;
//! a lasso drawn on the display needs view → global. [`ViewLayout`] does both
//! against a borrowed [`Partition`], so build a fresh one whenever a
//! `cluster` or `select_clu` notification arrives.

use alloc::vec::Vec;

use crate::error::{CluError, Result};
use crate::label::Label;
use crate::partition::{LocalIndex, Partition};

/// A laid-out sequence of groups over one partition state.
#[derive(Clone, Debug)]
pub struct ViewLayout<'a> {
    partition: &'a Partition,
    /// `(group, offset)` in display order.
    blocks: Vec<(Label, usize)>,
    len: usize,
}

impl<'a> ViewLayout<'a> {
    /// Lay out the partition's currently visible groups.
    pub fn new(partition: &'a Partition) -> Self {
        Self::build(partition, partition.visible_groups())
    }

    /// Lay out an explicit list of groups, in ascending label order.
    pub fn for_groups(partition: &'a Partition, groups: &[Label]) -> Result<Self> {
        if let Some(&missing) = groups.iter().find(|&&g| !partition.contains_group(g)) {
            return Err(CluError::UnknownGroup(missing));
        }
        let mut groups = groups.to_vec();
        groups.sort_unstable();
        groups.dedup();
        Ok(Self::build(partition, &groups))
    }

    fn build(partition: &'a Partition, groups: &[Label]) -> Self {
        let mut blocks = Vec::with_capacity(groups.len());
        let mut offset = 0;
        for &g in groups {
            blocks.push((g, offset));
            offset += partition.count(g);
        }
        Self { partition, blocks, len: offset }
    }

    /// Total number of displayed items.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when nothing is displayed.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Groups in display order.
    pub fn groups(&self) -> impl Iterator<Item = Label> + '_ {
        self.blocks.iter().map(|&(g, _)| g)
    }

    /// View index of a group's first item.
    pub fn offset(&self, group: Label) -> Option<usize> {
        self.blocks
            .iter()
            .find(|&&(g, _)| g == group)
            .map(|&(_, off)| off)
    }

    /// View indices of the given items, ascending. Items in hidden groups are skipped.
    pub fn global_to_view(&self, globals: &[usize]) -> Result<Vec<usize>> {
        let local = self.partition.global_to_local(globals)?;
        let mut view = Vec::new();
        for &(group, offset) in &self.blocks {
            if let Some(positions) = local.get(&group) {
                view.extend(positions.iter().map(|&i| i + offset));
            }
        }
        Ok(view)
    }

    /// Global indices of the given view indices, ascending and distinct.
    pub fn view_to_global(&self, view: &[usize]) -> Result<Vec<usize>> {
        let mut local = LocalIndex::new();
        for &v in view {
            if v >= self.len {
                return Err(CluError::InvalidInput("view index past end of layout"));
            }
            // last block starting at or before v
            let block = self.blocks.partition_point(|&(_, off)| off <= v) - 1;
            let (group, offset) = self.blocks[block];
            local.entry(group).or_default().push(v - offset);
        }
        self.partition.local_to_global(&local)
    }
}
