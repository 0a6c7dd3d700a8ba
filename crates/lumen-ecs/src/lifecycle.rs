//! Per-entity lifecycle hooks driven by the scene driver.
//!
//! Each stage has a single overridable handler slot and an event channel with
//! any number of subscribers. For every invocation the handler runs first,
//! then the channel's subscribers in registration order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::observer::ObserverId;
use crate::scene::SceneId;

// ---------------------------------------------------------------------------
// LifecycleStage / FrameContext / LifecycleEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStage {
    Initialize,
    PreUpdate,
    PostUpdate,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 3] = [
        LifecycleStage::Initialize,
        LifecycleStage::PreUpdate,
        LifecycleStage::PostUpdate,
    ];

    fn index(self) -> usize {
        match self {
            LifecycleStage::Initialize => 0,
            LifecycleStage::PreUpdate => 1,
            LifecycleStage::PostUpdate => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStage::Initialize => "initialize",
            LifecycleStage::PreUpdate => "preupdate",
            LifecycleStage::PostUpdate => "postupdate",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied frame information passed to every hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameContext {
    /// Frames completed before this one.
    pub frame: u64,
    /// Simulation time in seconds at the start of the frame.
    pub time: f64,
    /// Scene being driven, if any.
    pub scene: Option<SceneId>,
}

/// Payload delivered to handlers and subscribers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleEvent {
    pub stage: LifecycleStage,
    pub entity: EntityId,
    pub context: FrameContext,
    /// Seconds since the previous frame; `0.0` for initialize.
    pub elapsed: f64,
}

type LifecycleCallback = Box<dyn FnMut(&LifecycleEvent)>;

// ---------------------------------------------------------------------------
// LifecycleHooks
// ---------------------------------------------------------------------------

/// Handler slots and event channels for one entity.
#[derive(Default)]
pub struct LifecycleHooks {
    handlers: [Option<LifecycleCallback>; 3],
    subscribers: Vec<(ObserverId, LifecycleStage, LifecycleCallback)>,
    next_id: u64,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overridable handler for `stage`.
    pub fn set_handler<F>(&mut self, stage: LifecycleStage, handler: F)
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        self.handlers[stage.index()] = Some(Box::new(handler));
    }

    pub fn clear_handler(&mut self, stage: LifecycleStage) {
        self.handlers[stage.index()] = None;
    }

    pub fn has_handler(&self, stage: LifecycleStage) -> bool {
        self.handlers[stage.index()].is_some()
    }

    /// Subscribe to the event channel of `stage`.
    pub fn on<F>(&mut self, stage: LifecycleStage, callback: F) -> ObserverId
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, stage, Box::new(callback)));
        id
    }

    pub fn off(&mut self, id: ObserverId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(observer, _, _)| *observer != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self, stage: LifecycleStage) -> usize {
        self.subscribers
            .iter()
            .filter(|(_, subscribed, _)| *subscribed == stage)
            .count()
    }

    /// Run the handler, then every subscriber of the event's stage.
    pub(crate) fn dispatch(&mut self, event: &LifecycleEvent) {
        if let Some(handler) = &mut self.handlers[event.stage.index()] {
            handler(event);
        }
        for (_, stage, callback) in &mut self.subscribers {
            if *stage == event.stage {
                callback(event);
            }
        }
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<_> = LifecycleStage::ALL
            .iter()
            .filter(|stage| self.has_handler(**stage))
            .collect();
        f.debug_struct("LifecycleHooks")
            .field("handlers", &handlers)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(stage: LifecycleStage) -> LifecycleEvent {
        LifecycleEvent {
            stage,
            entity: EntityId::from_raw(9),
            context: FrameContext::default(),
            elapsed: 1.0 / 60.0,
        }
    }

    #[test]
    fn handler_runs_before_subscribers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = LifecycleHooks::new();
        {
            let log = Rc::clone(&log);
            hooks.on(LifecycleStage::PreUpdate, move |_| log.borrow_mut().push("event"));
        }
        {
            let log = Rc::clone(&log);
            hooks.set_handler(LifecycleStage::PreUpdate, move |_| {
                log.borrow_mut().push("handler")
            });
        }

        hooks.dispatch(&event(LifecycleStage::PreUpdate));
        assert_eq!(*log.borrow(), vec!["handler", "event"]);
    }

    #[test]
    fn dispatch_only_reaches_matching_stage() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = LifecycleHooks::new();
        for stage in LifecycleStage::ALL {
            let hits = Rc::clone(&hits);
            hooks.on(stage, move |ev| hits.borrow_mut().push(ev.stage));
        }

        hooks.dispatch(&event(LifecycleStage::PostUpdate));
        assert_eq!(*hits.borrow(), vec![LifecycleStage::PostUpdate]);
    }

    #[test]
    fn set_handler_replaces_previous() {
        let hits = Rc::new(RefCell::new(Vec::new()));
        let mut hooks = LifecycleHooks::new();
        for label in ["old", "new"] {
            let hits = Rc::clone(&hits);
            hooks.set_handler(LifecycleStage::Initialize, move |_| {
                hits.borrow_mut().push(label)
            });
        }
        hooks.dispatch(&event(LifecycleStage::Initialize));
        assert_eq!(*hits.borrow(), vec!["new"]);

        hooks.clear_handler(LifecycleStage::Initialize);
        assert!(!hooks.has_handler(LifecycleStage::Initialize));
    }

    #[test]
    fn off_removes_subscriber() {
        let mut hooks = LifecycleHooks::new();
        let id = hooks.on(LifecycleStage::Initialize, |_| {});
        assert_eq!(hooks.subscriber_count(LifecycleStage::Initialize), 1);
        assert!(hooks.off(id));
        assert_eq!(hooks.subscriber_count(LifecycleStage::Initialize), 0);
    }
}
