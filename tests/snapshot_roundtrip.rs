//! Integration tests for engine snapshots.
//!
//! Run with: `cargo test --features serde`

#![cfg(feature = "serde")]

use clu_core::snapshot::{PartitionSnapshot, SNAPSHOT_VERSION};
use clu_core::{
    CluError, ClusterEngine, ClusteringInfo, EngineConfig, EventKind, LabelSpec, LocalIndex,
    ProbabilityMatrix,
};

// ─── helpers ─────────────────────────────────────────────────────────────────

/// An engine with history, a selection, hidden groups and clustering info.
fn edited_engine() -> ClusterEngine {
    let config = EngineConfig {
        history_limit: Some(4),
        ..EngineConfig::default()
    };
    let info = ClusteringInfo {
        method: Some("hdbscan".into()),
        default_selection: vec![1],
        probabilities: Some(ProbabilityMatrix::new(6, 2, vec![0.5; 12]).unwrap()),
        ..ClusteringInfo::default()
    };
    let mut clu = ClusterEngine::with_config(vec![0, 0, 1, 1, 2, 2], config)
        .unwrap()
        .with_clustering_info(info)
        .unwrap();

    let mut from = LocalIndex::new();
    from.insert(2, vec![1]);
    clu.move_to(&from, 0).unwrap();
    clu.fill(Some(&[0][..]), LabelSpec::Single(1)).unwrap();
    clu.select(&[3, 1]).unwrap();
    clu.select_clu(&[1]).unwrap();
    clu
}

// ─── round trip ──────────────────────────────────────────────────────────────

#[test]
fn json_round_trip_restores_state() {
    let clu = edited_engine();
    let snapshot = PartitionSnapshot::from_engine(&clu);
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.n_items(), 6);

    let json = serde_json::to_string(&snapshot).unwrap();
    let decoded: PartitionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, snapshot);

    let restored = decoded.into_engine().unwrap();
    assert_eq!(restored.membership(), clu.membership());
    assert_eq!(restored.pristine(), clu.pristine());
    assert_eq!(restored.history(), clu.history());
    assert_eq!(restored.partition().selection(), &[1, 3]);
    assert_eq!(restored.partition().visible_groups(), &[1]);
    assert_eq!(restored.config(), clu.config());
    assert_eq!(restored.clustering_info(), clu.clustering_info());
}

#[test]
fn restored_engine_keeps_undoing() {
    let clu = edited_engine();
    let mut restored = PartitionSnapshot::from_engine(&clu).into_engine().unwrap();
    restored.undo().unwrap();
    restored.undo().unwrap();
    assert_eq!(restored.membership(), &[0, 0, 1, 1, 2, 2]);
    assert_eq!(restored.undo(), Err(CluError::EmptyUndoHistory));
}

#[test]
fn restored_engine_has_no_observers() {
    let mut restored = PartitionSnapshot::from_engine(&edited_engine())
        .into_engine()
        .unwrap();
    let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = std::sync::Arc::clone(&hits);
    restored.on(EventKind::Cluster, move |_, _| {
        counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    });
    restored.reset();
    assert_eq!(hits.load(std::sync::atomic::Ordering::Relaxed), 1);
}

// ─── rejected snapshots ──────────────────────────────────────────────────────

#[test]
fn unknown_version_rejected() {
    let mut snapshot = PartitionSnapshot::from_engine(&edited_engine());
    snapshot.version = SNAPSHOT_VERSION + 1;
    assert!(matches!(
        snapshot.into_engine(),
        Err(CluError::InvalidInput(_))
    ));
}

#[test]
fn inconsistent_snapshot_rejected() {
    let mut snapshot = PartitionSnapshot::from_engine(&edited_engine());
    snapshot.selection = vec![99];
    assert_eq!(
        snapshot.into_engine().unwrap_err(),
        CluError::GlobalIndexOutOfRange { index: 99, len: 6 }
    );

    let mut snapshot = PartitionSnapshot::from_engine(&edited_engine());
    snapshot.visible = vec![7];
    assert_eq!(snapshot.into_engine().unwrap_err(), CluError::UnknownGroup(7));

    let mut snapshot = PartitionSnapshot::from_engine(&edited_engine());
    snapshot.membership[0] = -1;
    assert!(matches!(
        snapshot.into_engine(),
        Err(CluError::InvalidInput(_))
    ));
}

#[test]
fn history_limit_must_match_config() {
    let mut snapshot = PartitionSnapshot::from_engine(&edited_engine());
    assert_eq!(snapshot.history.limit(), Some(4));
    snapshot.config.history_limit = None;
    assert_eq!(
        snapshot.into_engine().unwrap_err(),
        CluError::InvalidInput("history limit disagrees with configuration")
    );
}
