//! Event dispatch
//!
//! Named notifications emitted by animation controllers.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

new_key_type! {
    /// Handle returned by [`EventDispatcher::register`], used to unregister
    pub struct ListenerId;
}

/// Events a controller can emit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControllerEvent {
    /// Every queued effect has completed and the controller stopped
    Done,
}

impl ControllerEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            ControllerEvent::Done => "done",
        }
    }
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event listener function type
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Dispatches controller events to registered listeners
pub struct EventDispatcher {
    listeners: SlotMap<ListenerId, Listener>,
    by_event: FxHashMap<ControllerEvent, SmallVec<[ListenerId; 2]>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
            by_event: FxHashMap::default(),
        }
    }

    /// Register a listener for an event
    pub fn register<F>(&mut self, event: ControllerEvent, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.listeners.insert(Arc::new(listener));
        self.by_event.entry(event).or_default().push(id);
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(id).is_none() {
            return false;
        }
        for ids in self.by_event.values_mut() {
            ids.retain(|existing| *existing != id);
        }
        true
    }

    /// Listeners for an event in registration order.
    ///
    /// The returned handles are detached from the dispatcher, so callers can
    /// release any lock guarding it before invoking them.
    pub fn snapshot(&self, event: ControllerEvent) -> Vec<Listener> {
        self.by_event
            .get(&event)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.listeners.get(*id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Invoke every listener registered for an event
    pub fn dispatch(&self, event: ControllerEvent) {
        let listeners = self.snapshot(event);
        tracing::trace!(%event, listeners = listeners.len(), "dispatching");
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self, event: ControllerEvent) -> usize {
        self.by_event.get(&event).map_or(0, |ids| ids.len())
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
