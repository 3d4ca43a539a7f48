//! Event-emission capability
//!
//! Listeners are registered per event name and identified by the
//! `ListenerId` returned from `on`, which is the token `off` takes back.
//! `emit` snapshots the listener list before invoking it, so a listener
//! may register or deregister listeners without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::value::Value;

/// Event listener body
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Token identifying a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Named event listener lists.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Mutex<IndexMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventEmitter {
    /// Create an emitter with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event`
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Deregister a listener. Returns false if it was not registered.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.shift_remove(event);
        }
        removed
    }

    /// Invoke every listener of `event` with `args`.
    ///
    /// Returns true if the event had listeners.
    pub fn emit(&self, event: &str, args: &[Value]) -> bool {
        let snapshot: Vec<Listener> = match self.listeners.lock().get(event) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return false,
        };
        for listener in &snapshot {
            listener(args);
        }
        !snapshot.is_empty()
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.lock().get(event).map_or(0, Vec::len)
    }

    /// Event names with at least one listener, in registration order
    pub fn event_names(&self) -> Vec<String> {
        self.listeners.lock().keys().cloned().collect()
    }

    /// Drop all listeners of `event`, or of every event
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut listeners = self.listeners.lock();
        match event {
            Some(name) => {
                listeners.shift_remove(name);
            }
            None => listeners.clear(),
        }
    }
}
