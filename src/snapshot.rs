//! Portable snapshot of an engine for persistence and transport.
//!
//! The crate defines no file format of its own. A [`PartitionSnapshot`] is a
//! plain serde value; pick any serializer (JSON, bincode, …) to store it.
//!
//! Captured: live membership, construction-time membership, undo history,
//! selection, visible groups, configuration and clustering artifacts.
//! Not captured: observers. Callbacks belong to the running session and must
//! be registered again on the restored engine.
//!
//! # no_std
//!
//! This module requires the `serde` feature and works with `alloc` only.

use alloc::vec::Vec;

use crate::engine::{ClusterEngine, EngineConfig};
use crate::error::{CluError, Result};
use crate::history::UndoStack;
use crate::label::Label;
use crate::metadata::ClusteringInfo;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// A serializable capture of a [`ClusterEngine`].
///
/// # Example
///
/// ```rust,ignore
/// use clu_core::snapshot::PartitionSnapshot;
///
/// let snapshot = PartitionSnapshot::from_engine(&engine);
/// let json = serde_json::to_string(&snapshot).unwrap();
/// let restored: PartitionSnapshot = serde_json::from_str(&json).unwrap();
/// let engine = restored.into_engine().unwrap();
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct PartitionSnapshot {
    /// Format version, [`SNAPSHOT_VERSION`] for newly created snapshots.
    pub version: u16,
    /// Label of every item.
    pub membership: Vec<Label>,
    /// Membership right after construction.
    pub pristine: Vec<Label>,
    /// Undo history, oldest first.
    pub history: UndoStack,
    /// Highlighted items.
    pub selection: Vec<usize>,
    /// Visible groups.
    pub visible: Vec<Label>,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Clustering artifacts.
    pub info: ClusteringInfo,
}

impl PartitionSnapshot {
    /// Capture the engine's current state.
    pub fn from_engine(engine: &ClusterEngine) -> Self {
        let p = engine.partition();
        Self {
            version: SNAPSHOT_VERSION,
            membership: p.membership().to_vec(),
            pristine: engine.pristine().to_vec(),
            history: engine.history().clone(),
            selection: p.selection().to_vec(),
            visible: p.visible_groups().to_vec(),
            config: engine.config().clone(),
            info: engine.clustering_info().clone(),
        }
    }

    /// Rebuild an engine from the snapshot, with no observers registered.
    pub fn into_engine(self) -> Result<ClusterEngine> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CluError::InvalidInput("unsupported snapshot version"));
        }
        ClusterEngine::restore(self)
    }

    /// Number of items in the live membership.
    pub fn n_items(&self) -> usize {
        self.membership.len()
    }
}
