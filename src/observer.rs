/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Synchronous change notification.
//!
//! Observers register a callback for an [`EventKind`]. When the engine commits
//! a change it calls [`Observers::emit`], which invokes every callback
//! registered for that event immediately, in registration order, on the
//! calling thread. Nothing is buffered or dropped: by the time a mutator
//! returns, every observer has seen its notification.
//!
//! Callbacks receive the [`Notification`] and a read-only view of the
//! [`Partition`]; they pull whatever state they need from it.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;

use crate::error::CluError;
use crate::partition::Partition;

/// Named event channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// The membership array changed (`"cluster"`).
    Cluster,
    /// The item selection changed (`"select"`).
    Select,
    /// The set of visible groups changed (`"select_clu"`).
    SelectClu,
}

impl EventKind {
    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Select => "select",
            Self::SelectClu => "select_clu",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CluError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cluster" => Ok(Self::Cluster),
            "select" => Ok(Self::Select),
            "select_clu" => Ok(Self::SelectClu),
            _ => Err(CluError::InvalidInput("unknown event name")),
        }
    }
}

/// The operation that produced a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Every item moved to group 0.
    Reset,
    /// Groups collapsed into their minimum label.
    Merge,
    /// A sub-selection relocated to an existing group.
    Move,
    /// Two groups swapped labels.
    Exchange,
    /// A sub-selection moved into a fresh group.
    Split,
    /// Array slots physically deleted.
    Delete,
    /// Items permanently removed, history truncated to match.
    Remove,
    /// Pristine array restored minus some items.
    Mask,
    /// Labels overwritten directly.
    Fill,
    /// Labels overwritten and shifted down.
    Refill,
    /// Previous membership restored.
    Undo,
    /// Item selection replaced.
    Select,
    /// Visible groups replaced.
    SelectClu,
}

impl Action {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Merge => "merge",
            Self::Move => "move",
            Self::Exchange => "exchange",
            Self::Split => "split",
            Self::Delete => "delete",
            Self::Remove => "remove",
            Self::Mask => "mask",
            Self::Fill => "fill",
            Self::Refill => "refill",
            Self::Undo => "undo",
            Self::Select => "select",
            Self::SelectClu => "select_clu",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What observers receive: the channel, the action tag, and optionally who asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    /// Channel the notification was sent on.
    pub event: EventKind,
    /// Operation that committed.
    pub action: Action,
    /// Name of the component that triggered the change, if it gave one.
    pub caller: Option<String>,
}

/// Handle returned by [`Observers::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Observer callback.
pub type Callback = Box<dyn FnMut(&Notification, &Partition) + Send>;

/// Registry of callbacks keyed by event.
#[derive(Default)]
pub struct Observers {
    slots: HashMap<EventKind, Vec<(ObserverId, Callback)>>,
    next_id: u64,
}

impl Observers {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`. Callbacks for the same event run in
    /// the order they were registered.
    pub fn on<F>(&mut self, event: EventKind, callback: F) -> ObserverId
    where
        F: FnMut(&Notification, &Partition) + Send + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.slots
            .entry(event)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    /// Unregister a callback. Returns `false` if the id was not registered.
    pub fn off(&mut self, id: ObserverId) -> bool {
        for list in self.slots.values_mut() {
            if let Some(pos) = list.iter().position(|(slot, _)| *slot == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of callbacks registered for `event`.
    pub fn count(&self, event: EventKind) -> usize {
        self.slots.get(&event).map_or(0, Vec::len)
    }

    /// Invoke every callback registered for `note.event`, in registration order.
    pub fn emit(&mut self, note: &Notification, partition: &Partition) {
        let Some(list) = self.slots.get_mut(&note.event) else {
            return;
        };
        tracing::trace!(
            event = note.event.as_str(),
            action = note.action.as_str(),
            observers = list.len(),
            "emit"
        );
        for (_, callback) in list.iter_mut() {
            callback(note, partition);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("cluster", &self.count(EventKind::Cluster))
            .field("select", &self.count(EventKind::Select))
            .field("select_clu", &self.count(EventKind::SelectClu))
            .finish()
    }
}
