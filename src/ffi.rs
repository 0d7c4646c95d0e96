//! Python FFI bindings via PyO3.
//!
//! Exposes [`ClusterEngine`] to Python as `Clu`, with the attribute and method
//! names sorting GUIs already expect.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from clu_core import Clu
//!
//! clu = Clu([0, 0, 1, 1, 2])
//! clu.on("cluster", lambda action: print(action, clu.index_count))
//! clu.merge([0, 2])            # prints: merge {0: 3, 1: 2}
//! clu.move({1: [0]}, 0)        # -> (0, [2])
//! clu.undo()
//! ```
//!
//! Python callbacks run after the engine borrow is released, so they can read
//! the `Clu` object freely. They still run before the mutating call returns,
//! in registration order. A callback that raises aborts delivery: the
//! exception propagates out of the mutating call (whose edit has already
//! committed) and later callbacks for that call are skipped.

#![allow(non_snake_case)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use pyo3::exceptions::{PyIndexError, PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyTuple;

use crate::engine::ClusterEngine;
use crate::error::CluError;
use crate::label::{Label, LabelSpec};
use crate::metadata::ClusteringInfo;
use crate::observer::{EventKind, Notification};

fn to_py_err(e: CluError) -> PyErr {
    let msg = e.to_string();
    match e {
        CluError::UnknownGroup(_) => PyKeyError::new_err(msg),
        CluError::LocalIndexOutOfRange { .. } | CluError::GlobalIndexOutOfRange { .. } => {
            PyIndexError::new_err(msg)
        }
        _ => PyValueError::new_err(msg),
    }
}

/// Accept either a single int or a sequence of ints.
fn extract_labels(labels: &Bound<'_, PyAny>) -> PyResult<LabelSpec> {
    if let Ok(l) = labels.extract::<Label>() {
        return Ok(LabelSpec::Single(l));
    }
    Ok(LabelSpec::PerItem(labels.extract::<Vec<Label>>()?))
}

/// Positional arguments of `fill`: `(clu_to)` or `(global_idx, clu_to)`.
fn split_fill_args<T>(args: &[T]) -> Option<(Option<&T>, &T)> {
    match args {
        [labels] => Some((None, labels)),
        [targets, labels] => Some((Some(targets), labels)),
        _ => None,
    }
}

type Pending = Arc<Mutex<Vec<Notification>>>;

// ── Clu ───────────────────────────────────────────────────────────────────────

/// Cluster membership with merge/split/move editing, undo and callbacks.
///
/// Example::
///
///     clu = Clu([3, 3, 5, 5, 5])
///     clu.membership        # [0, 0, 1, 1, 1]
///     clu.split({1: [1, 2]})
///     clu.membership        # [0, 0, 1, 2, 2]
#[pyclass(name = "Clu")]
pub struct PyClu {
    inner: ClusterEngine,
    callbacks: Vec<(EventKind, PyObject)>,
    pending: Pending,
}

impl PyClu {
    /// Run queued Python callbacks once the engine is no longer borrowed.
    ///
    /// The queue is drained up front. If a callback raises, its exception is
    /// returned and the notifications after it are dropped, not redelivered.
    fn dispatch(slf: &Bound<'_, Self>) -> PyResult<()> {
        let py = slf.py();
        let (notes, callbacks) = {
            let this = slf.borrow();
            let notes = this
                .pending
                .lock()
                .map(|mut q| std::mem::take(&mut *q))
                .unwrap_or_default();
            let callbacks: Vec<(EventKind, PyObject)> = this
                .callbacks
                .iter()
                .map(|(kind, cb)| (*kind, cb.clone_ref(py)))
                .collect();
            (notes, callbacks)
        };
        for note in notes {
            for (_, cb) in callbacks.iter().filter(|(kind, _)| *kind == note.event) {
                cb.call1(py, (note.action.as_str(),))?;
            }
        }
        Ok(())
    }
}

#[pymethods]
impl PyClu {
    /// Create a Clu from per-item labels.
    ///
    /// Args:
    ///     membership: one integer label per item (may be negative or gapped)
    ///     default_select_clusters: groups the clustering suggests showing first
    ///     method: name of the clustering algorithm, informational only
    #[new]
    #[pyo3(signature = (membership, default_select_clusters=None, method=None))]
    pub fn new(
        membership: Vec<Label>,
        default_select_clusters: Option<Vec<Label>>,
        method: Option<String>,
    ) -> PyResult<Self> {
        let info = ClusteringInfo {
            method,
            default_selection: default_select_clusters.unwrap_or_default(),
            ..ClusteringInfo::default()
        };
        let mut inner = ClusterEngine::new(membership)
            .and_then(|e| e.with_clustering_info(info))
            .map_err(to_py_err)?;

        let pending: Pending = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::Cluster, EventKind::Select, EventKind::SelectClu] {
            let queue = Arc::clone(&pending);
            inner.on(kind, move |note, _| {
                if let Ok(mut q) = queue.lock() {
                    q.push(note.clone());
                }
            });
        }
        Ok(Self { inner, callbacks: Vec::new(), pending })
    }

    /// Register `callback(action)` for "cluster", "select" or "select_clu".
    pub fn on(&mut self, event: &str, callback: PyObject) -> PyResult<()> {
        let kind = event.parse::<EventKind>().map_err(to_py_err)?;
        self.callbacks.push((kind, callback));
        Ok(())
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Label of every item.
    #[getter]
    pub fn membership(&self) -> Vec<Label> {
        self.inner.membership().to_vec()
    }

    /// Sorted distinct labels.
    #[getter]
    pub fn index_id(&self) -> Vec<Label> {
        self.inner.partition().labels().to_vec()
    }

    /// Number of groups.
    #[getter]
    pub fn nclu(&self) -> usize {
        self.inner.partition().n_groups()
    }

    /// Number of items.
    #[getter]
    pub fn npts(&self) -> usize {
        self.inner.partition().n_items()
    }

    /// Group sizes keyed by label.
    #[getter]
    pub fn index_count(&self) -> BTreeMap<Label, usize> {
        self.inner.partition().counts().collect()
    }

    /// Highlighted items.
    #[getter]
    pub fn selectlist(&self) -> Vec<usize> {
        self.inner.partition().selection().to_vec()
    }

    /// Visible groups.
    #[getter]
    pub fn select_clus(&self) -> Vec<Label> {
        self.inner.partition().visible_groups().to_vec()
    }

    /// Groups suggested by the clustering run.
    #[getter]
    pub fn select_clusters(&self) -> Vec<Label> {
        self.inner.default_selection().to_vec()
    }

    /// Replace the suggested groups.
    #[setter]
    pub fn set_select_clusters(&mut self, clusters: Vec<Label>) {
        self.inner.set_default_selection(clusters);
    }

    /// Whether the membership differs from the last undo snapshot.
    #[getter]
    pub fn changed(&self) -> bool {
        self.inner.changed()
    }

    /// Global indices of one group.
    pub fn __getitem__(&self, group: Label) -> PyResult<Vec<usize>> {
        self.inner
            .partition()
            .group(group)
            .map(<[usize]>::to_vec)
            .map_err(to_py_err)
    }

    /// Number of items.
    pub fn __len__(&self) -> usize {
        self.inner.partition().n_items()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "Clu(npts={}, nclu={})",
            self.inner.partition().n_items(),
            self.inner.partition().n_groups()
        )
    }

    /// `{group: [local, ...]}` for the given global indices.
    pub fn global2local(&self, global_idx: Vec<usize>) -> PyResult<BTreeMap<Label, Vec<usize>>> {
        self.inner
            .partition()
            .global_to_local(&global_idx)
            .map_err(to_py_err)
    }

    /// Sorted global indices for `{group: [local, ...]}`.
    pub fn local2global(&self, local_idx: BTreeMap<Label, Vec<usize>>) -> PyResult<Vec<usize>> {
        self.inner
            .partition()
            .local_to_global(&local_idx)
            .map_err(to_py_err)
    }

    // ── Selection ──────────────────────────────────────────────────────────

    /// Highlight items by global index.
    #[pyo3(signature = (selectlist, caller=None))]
    pub fn select(slf: &Bound<'_, Self>, selectlist: Vec<usize>, caller: Option<String>) -> PyResult<()> {
        {
            let mut this = slf.borrow_mut();
            match caller {
                Some(c) => this.inner.select_by(&selectlist, c),
                None => this.inner.select(&selectlist),
            }
            .map_err(to_py_err)?;
        }
        Self::dispatch(slf)
    }

    /// Set the visible groups.
    pub fn select_clu(slf: &Bound<'_, Self>, selected_clu_list: Vec<Label>) -> PyResult<()> {
        slf.borrow_mut()
            .inner
            .select_clu(&selected_clu_list)
            .map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    // ── Structural edits ───────────────────────────────────────────────────

    /// Put every item in group 0.
    pub fn reset(slf: &Bound<'_, Self>) -> PyResult<()> {
        slf.borrow_mut().inner.reset();
        Self::dispatch(slf)
    }

    /// Merge groups into the smallest label among them.
    pub fn merge(slf: &Bound<'_, Self>, mergelist: Vec<Label>) -> PyResult<()> {
        slf.borrow_mut().inner.merge(&mergelist).map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Move `{group: [local, ...]}` into `clu_to`; returns `(group, local)`.
    #[pyo3(name = "move")]
    pub fn move_(
        slf: &Bound<'_, Self>,
        clus_from: BTreeMap<Label, Vec<usize>>,
        clu_to: Label,
    ) -> PyResult<(Label, Vec<usize>)> {
        let out = slf
            .borrow_mut()
            .inner
            .move_to(&clus_from, clu_to)
            .map_err(to_py_err)?;
        Self::dispatch(slf)?;
        Ok((out.group, out.local))
    }

    /// Swap the labels of two groups.
    pub fn exchange(slf: &Bound<'_, Self>, clus1: Label, clus2: Label) -> PyResult<()> {
        slf.borrow_mut()
            .inner
            .exchange(clus1, clus2)
            .map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Move `{group: [local, ...]}` into a new group; returns `(group, local)`.
    pub fn split(
        slf: &Bound<'_, Self>,
        clus_from: BTreeMap<Label, Vec<usize>>,
    ) -> PyResult<(Label, Vec<usize>)> {
        let out = slf.borrow_mut().inner.split(&clus_from).map_err(to_py_err)?;
        Self::dispatch(slf)?;
        Ok((out.group, out.local))
    }

    /// Delete membership slots (undoable; history lengths untouched).
    pub fn delete(slf: &Bound<'_, Self>, idx: Vec<usize>) -> PyResult<()> {
        slf.borrow_mut().inner.delete(&idx).map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Permanently remove items from membership and history.
    pub fn remove(slf: &Bound<'_, Self>, global_ids: Vec<usize>) -> PyResult<()> {
        slf.borrow_mut().inner.remove(&global_ids).map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Restore the construction-time membership minus `global_ids`.
    pub fn mask(slf: &Bound<'_, Self>, global_ids: Vec<usize>) -> PyResult<()> {
        slf.borrow_mut().inner.mask(&global_ids).map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// `fill(clu_to)` for every item, or `fill(global_idx, clu_to)` for some.
    #[pyo3(signature = (*args))]
    pub fn fill(slf: &Bound<'_, Self>, args: &Bound<'_, PyTuple>) -> PyResult<()> {
        let args: Vec<Bound<'_, PyAny>> = args.iter().collect();
        let (targets, labels) = split_fill_args(&args).ok_or_else(|| {
            PyTypeError::new_err("fill() takes (clu_to) or (global_idx, clu_to)")
        })?;
        let targets = targets.map(|t| t.extract::<Vec<usize>>()).transpose()?;
        let labels = extract_labels(labels)?;
        slf.borrow_mut()
            .inner
            .fill(targets.as_deref(), labels)
            .map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Overwrite some labels, shifting down if group 0 empties.
    pub fn refill(
        slf: &Bound<'_, Self>,
        global_idx: Vec<usize>,
        labels: &Bound<'_, PyAny>,
    ) -> PyResult<()> {
        let labels = extract_labels(labels)?;
        slf.borrow_mut()
            .inner
            .refill(&global_idx, labels)
            .map_err(to_py_err)?;
        Self::dispatch(slf)
    }

    /// Restore the previous membership. Returns False when there is nothing to undo.
    pub fn undo(slf: &Bound<'_, Self>) -> PyResult<bool> {
        let undone = match slf.borrow_mut().inner.undo() {
            Ok(()) => true,
            Err(CluError::EmptyUndoHistory) => false,
            Err(e) => return Err(to_py_err(e)),
        };
        Self::dispatch(slf)?;
        Ok(undone)
    }
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Cluster-membership engine for interactive spike sorting.
#[pymodule]
pub fn clu_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyClu>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_args_follow_python_order() {
        assert_eq!(split_fill_args(&["labels"]), Some((None, &"labels")));
        assert_eq!(
            split_fill_args(&["idx", "labels"]),
            Some((Some(&"idx"), &"labels"))
        );
        assert_eq!(split_fill_args::<&str>(&[]), None);
        assert_eq!(split_fill_args(&["a", "b", "c"]), None);
    }
}
