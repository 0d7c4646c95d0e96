//! # clu-core
//!
//! Cluster-membership management for interactive spike sorting.
//!
//! Every detected event (a spike, a sample, any item in a large ordered
//! collection) belongs to exactly one numbered group. An operator reshapes the
//! grouping by hand: merging units, splitting off a sub-selection, moving
//! stray events, undoing a bad edit. Displays and downstream analyses follow
//! every change through synchronous notifications.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! initial labels → ClusterEngine ──edit──→ Partition (rebuilt) ──notify──→ observers
//!                       │                                                   │
//!                   UndoStack                                  ViewLayout (display indices)
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`label`] | [`Label`], [`LabelSpec`] | Label type and normalization (shift, rank compaction) |
//! | [`partition`] | [`Partition`], [`LocalIndex`] | Membership array, group tables, global ↔ local translation |
//! | [`history`] | [`UndoStack`] | Bounded undo snapshots kept index-compatible with deletions |
//! | [`observer`] | [`EventKind`], [`Action`], [`Notification`] | Synchronous observer registry |
//! | [`engine`] | [`ClusterEngine`], [`EngineConfig`] | Structural edits, undo, selection |
//! | [`layout`] | [`ViewLayout`] | Global ↔ view index translation for end-to-end displays |
//! | [`metadata`] | [`ClusteringInfo`] | Opaque artifacts from the clustering run |
//! | `snapshot` | `PartitionSnapshot` | Serializable engine capture (requires `serde` feature) |
//! | `ffi` | `Clu` | Python bindings (requires `python-ffi` feature) |
//!
//! ## Example
//!
//! ```rust
//! use clu_core::{ClusterEngine, LocalIndex};
//!
//! let mut clu = ClusterEngine::new(vec![3, 3, 5, 5, 5]).unwrap();
//! assert_eq!(clu.membership(), &[0, 0, 1, 1, 1]);
//!
//! // split the last two items of group 1 into a new group
//! let mut from = LocalIndex::new();
//! from.insert(1, vec![1, 2]);
//! let moved = clu.split(&from).unwrap();
//! assert_eq!(moved.group, 2);
//! assert_eq!(clu.membership(), &[0, 0, 1, 2, 2]);
//! ```
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default and needs only `alloc`. Enable the
//! `std` feature when linking against std anyway, `serde` for the snapshot
//! module and serde derives, and `python-ffi` for the Python extension.
//!
//! ## License
//!
//! Business Source License 1.1.

#![cfg_attr(not(any(feature = "std", feature = "python-ffi", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

pub mod engine;
pub mod error;
pub mod history;
pub mod label;
pub mod layout;
pub mod metadata;
pub mod observer;
pub mod partition;
#[cfg(feature = "serde")]
pub mod snapshot;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use engine::{ClusterEngine, EngineConfig, MoveOutcome};
pub use error::{CluError, Result};
pub use history::UndoStack;
pub use label::{Label, LabelSpec};
pub use layout::ViewLayout;
pub use metadata::{ClusteringInfo, CondensedTreeEdge, ProbabilityMatrix};
pub use observer::{Action, EventKind, Notification, ObserverId, Observers};
pub use partition::{LocalIndex, Partition};
