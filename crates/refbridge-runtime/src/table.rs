//! Reference table
//!
//! Maps handles to live values. Handles come from a strictly increasing
//! counter starting at 1 and are never reused; handle 0 holds the root
//! namespace and is never released.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use refbridge_sdk::{BridgeError, BridgeResult, Handle, Value};
use tracing::debug;

use crate::protocol::PollingId;

/// A live value plus the subscriptions that target it
struct Entry {
    value: Value,
    polling: Vec<PollingId>,
}

/// Thread-safe table mapping handles to live values.
pub struct ReferenceTable {
    entries: DashMap<Handle, Entry>,
    next_id: AtomicU64,
}

impl ReferenceTable {
    /// Create a table holding `root` at handle 0
    pub fn new(root: Value) -> Self {
        let entries = DashMap::new();
        entries.insert(
            Handle::ROOT,
            Entry {
                value: root,
                polling: Vec::new(),
            },
        );
        Self {
            entries,
            next_id: AtomicU64::new(1),
        }
    }

    /// Store a value under a fresh handle
    pub fn allocate(&self, value: Value) -> Handle {
        let handle = Handle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            handle,
            Entry {
                value,
                polling: Vec::new(),
            },
        );
        handle
    }

    /// Look up the value behind a handle
    pub fn resolve(&self, handle: Handle) -> BridgeResult<Value> {
        self.entries
            .get(&handle)
            .map(|entry| entry.value.clone())
            .ok_or(BridgeError::ReferenceNotFound(handle))
    }

    /// Check if a handle is live
    pub fn contains(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Record that subscription `id` targets `handle`
    pub fn attach_polling(&self, handle: Handle, id: PollingId) -> BridgeResult<()> {
        let mut entry = self
            .entries
            .get_mut(&handle)
            .ok_or(BridgeError::ReferenceNotFound(handle))?;
        if !entry.polling.contains(&id) {
            entry.polling.push(id);
        }
        Ok(())
    }

    /// Forget that subscription `id` targets `handle`
    pub fn detach_polling(&self, handle: Handle, id: &PollingId) {
        if let Some(mut entry) = self.entries.get_mut(&handle) {
            entry.polling.retain(|p| p != id);
        }
    }

    /// Polling ids targeting `handle`
    pub fn polling_ids(&self, handle: Handle) -> Vec<PollingId> {
        self.entries
            .get(&handle)
            .map(|entry| entry.polling.clone())
            .unwrap_or_default()
    }

    /// Release a handle.
    ///
    /// `teardown` runs once per subscription targeting the handle, before
    /// the entry is removed and without any table lock held.
    pub fn release_with(
        &self,
        handle: Handle,
        mut teardown: impl FnMut(&PollingId),
    ) -> BridgeResult<Value> {
        if handle.is_root() {
            return Err(BridgeError::Protocol(
                "Handle 0 is the root namespace and cannot be freed".to_string(),
            ));
        }
        if !self.contains(handle) {
            return Err(BridgeError::ReferenceNotFound(handle));
        }
        for id in self.polling_ids(handle) {
            teardown(&id);
        }
        let (_, entry) = self
            .entries
            .remove(&handle)
            .ok_or(BridgeError::ReferenceNotFound(handle))?;
        debug!(%handle, "released");
        Ok(entry.value)
    }

    /// Number of live handles, root included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the root entry is permanent
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use refbridge_sdk::Object;

    #[test]
    fn test_root_is_seeded() {
        let table = ReferenceTable::new(Value::object(Object::new().with("x", 1)));
        assert!(table.contains(Handle::ROOT));
        assert_eq!(table.len(), 1);
        let root = table.resolve(Handle::ROOT).unwrap();
        assert!(root.get("x").is_some());
    }

    #[test]
    fn test_allocate_then_release() {
        let table = ReferenceTable::new(Value::Null);
        let h = table.allocate(Value::from("a"));
        assert_eq!(h, Handle(1));
        assert_eq!(table.resolve(h).unwrap().as_str(), Some("a"));

        table.release_with(h, |_| {}).unwrap();
        assert_eq!(table.resolve(h).unwrap_err(), BridgeError::ReferenceNotFound(h));
        assert_eq!(
            table.release_with(h, |_| {}).unwrap_err(),
            BridgeError::ReferenceNotFound(h)
        );
        // Freed handles are not reused
        assert_eq!(table.allocate(Value::Null), Handle(2));
    }

    #[test]
    fn test_root_cannot_be_released() {
        let table = ReferenceTable::new(Value::Null);
        let err = table.release_with(Handle::ROOT, |_| {}).unwrap_err();
        assert_eq!(err.kind(), "ProtocolError");
        assert!(table.contains(Handle::ROOT));
    }

    #[test]
    fn test_release_tears_down_subscriptions() {
        let table = ReferenceTable::new(Value::Null);
        let h = table.allocate(Value::object(Object::new()));
        table.attach_polling(h, PollingId::Int(7)).unwrap();
        table.attach_polling(h, PollingId::Str("p".into())).unwrap();
        table.attach_polling(h, PollingId::Int(7)).unwrap();

        let mut torn = Vec::new();
        table
            .release_with(h, |id| {
                // Detaching from inside teardown must not deadlock
                table.detach_polling(h, id);
                torn.push(id.clone());
            })
            .unwrap();
        assert_eq!(torn, vec![PollingId::Int(7), PollingId::Str("p".into())]);
    }

    #[test]
    fn test_attach_to_unknown_handle() {
        let table = ReferenceTable::new(Value::Null);
        assert!(table.attach_polling(Handle(9), PollingId::Int(1)).is_err());
    }

    proptest! {
        #[test]
        fn test_handles_strictly_increase(
            frees in proptest::collection::vec(any::<bool>(), 1..64)
        ) {
            let table = ReferenceTable::new(Value::Null);
            let mut last = Handle::ROOT;
            for free in frees {
                let h = table.allocate(Value::Null);
                prop_assert!(h > last);
                last = h;
                if free {
                    table.release_with(h, |_| {}).unwrap();
                    prop_assert!(table.resolve(h).is_err());
                }
            }
        }
    }
}
