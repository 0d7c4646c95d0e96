//! # Manual Sorting Session
//!
//! Replays a short curation session on one tetrode's worth of spikes: the
//! clustering over-splits one unit and lumps two others together. The
//! operator merges, splits, moves a few outliers, changes their mind once and
//! hides the noise cluster. A raster view and a feature view follow along
//! through observers.
//!
//! Run with `RUST_LOG=clu_core=debug cargo run --example sorting_session` to
//! see the engine's own trace.

use std::sync::{Arc, Mutex};

use clu_core::{ClusterEngine, EventKind, LocalIndex, Partition, ViewLayout};
use tracing_subscriber::EnvFilter;

// ── Spikes ───────────────────────────────────────────────────────────────────

/// Labels as they come out of the clustering run. `-1` is noise.
fn initial_labels() -> Vec<i64> {
    let mut labels = Vec::new();
    for i in 0..48 {
        labels.push(match i % 8 {
            0 => -1,
            1 | 2 => 4,
            3 => 7, // same unit as 4, split by the clustering
            4 | 5 | 6 => 9,
            _ => 12,
        });
    }
    labels
}

// ── Display helpers ──────────────────────────────────────────────────────────

fn bar(count: usize, total: usize) -> String {
    let filled = (count * 30).div_ceil(total.max(1));
    format!("{:<30} {:>3}", "█".repeat(filled), count)
}

fn print_groups(title: &str, p: &Partition) {
    println!("\n── {title} ──");
    for (label, count) in p.counts() {
        println!("  unit {label:>2} {}", bar(count, p.n_items()));
    }
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let mut clu = ClusterEngine::new(initial_labels()).expect("labels are non-empty");
    print_groups("after clustering", clu.partition());

    // The raster view redraws on every membership change.
    let redraws = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&redraws);
    clu.on(EventKind::Cluster, move |note, p| {
        *counter.lock().unwrap() += 1;
        println!("  [raster] {} → {} units", note.action, p.n_groups());
    });

    // The feature view highlights whatever another view selects.
    clu.on(EventKind::Select, |note, p| {
        let layout = ViewLayout::new(p);
        let view = layout.global_to_view(p.selection()).unwrap_or_default();
        println!(
            "  [features] {} selected by {}, view rows {:?}",
            p.selection().len(),
            note.caller.as_deref().unwrap_or("?"),
            view
        );
    });

    // Units 1 and 2 are the same neuron.
    clu.merge(&[1, 2]).expect("both units exist");
    print_groups("merged 1 + 2", clu.partition());

    // Labels were compacted, so the lumped unit is now 2. Its last third is a
    // second waveform.
    let n = clu.partition().count(2);
    let mut tail = LocalIndex::new();
    tail.insert(2, (2 * n / 3..n).collect());
    let split = clu.split(&tail).expect("local indices are in range");
    println!("  split off {} spikes as unit {}", split.local.len(), split.group);
    print_groups("split unit 2", clu.partition());

    // Select two outliers of unit 1 in the waveform view, then move them to noise.
    let outliers = clu.partition().group_global(1, &[0, 1]).expect("unit 1 has 2+ spikes");
    clu.select_by(&outliers, "waveform view").expect("indices are in range");
    let picked = clu.partition().global_to_local(&outliers).expect("indices are in range");
    clu.move_to(&picked, 0).expect("noise unit exists");
    print_groups("moved outliers to noise", clu.partition());

    // Second thoughts.
    clu.undo().expect("move is on the history");
    print_groups("undo", clu.partition());

    // Hide noise from the raster.
    let units: Vec<i64> = clu.partition().labels().iter().copied().filter(|&l| l != 0).collect();
    clu.select_clu(&units).expect("labels come from the partition");
    let layout = ViewLayout::new(clu.partition());
    println!(
        "\nraster shows units {:?}, {} rows",
        layout.groups().collect::<Vec<_>>(),
        layout.len()
    );

    println!("\n{}", clu.partition());
    println!(
        "raster redraws: {}, undo depth: {}",
        redraws.lock().unwrap(),
        clu.history().len()
    );
}
