//! Synchronous publish/subscribe channels for component changes.
//!
//! Each entity exposes two independent [`ComponentObservable`] channels, one
//! for additions and one for removals. Observers run on the caller's thread at
//! the moment the change is applied, in registration order. Nothing is
//! buffered or replayed for late subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentType};
use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// ObserverId
// ---------------------------------------------------------------------------

/// Handle returned by `register`, used to unregister later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub(crate) u64);

// ---------------------------------------------------------------------------
// ComponentChange
// ---------------------------------------------------------------------------

/// Which way a component moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Removed,
}

impl ChangeKind {
    /// Event name as surfaced to observers.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "Component Added",
            ChangeKind::Removed => "Component Removed",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single component change, borrowed for the duration of the notification.
#[derive(Debug, Clone, Copy)]
pub struct ComponentChange<'a> {
    pub kind: ChangeKind,
    /// Entity the component was attached to or detached from.
    pub entity: EntityId,
    /// The component instance itself.
    pub component: &'a dyn Component,
}

impl ComponentChange<'_> {
    pub fn component_type(&self) -> ComponentType {
        self.component.component_type()
    }
}

// ---------------------------------------------------------------------------
// ComponentObservable
// ---------------------------------------------------------------------------

type ChangeCallback = Box<dyn FnMut(&ComponentChange<'_>)>;

/// One channel of component change notifications.
#[derive(Default)]
pub struct ComponentObservable {
    observers: Vec<(ObserverId, ChangeCallback)>,
    next_id: u64,
}

impl ComponentObservable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `callback`. Callbacks fire in registration order.
    pub fn register<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&ComponentChange<'_>) + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscription. Returns `false` if `id` was not registered.
    pub fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn notify(&mut self, change: &ComponentChange<'_>) {
        for (_, callback) in &mut self.observers {
            callback(change);
        }
    }
}

impl fmt::Debug for ComponentObservable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentObservable")
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
