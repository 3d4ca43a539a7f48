//! Event polling adaptor
//!
//! Turns native event emission into notifications. A subscription's
//! listener only queues the emitted arguments; the session's pump task
//! allocates a handle for each queued bundle and sends the notification,
//! so listeners never touch the reference table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use refbridge_sdk::{BridgeError, BridgeResult, EventEmitter, Handle, ListenerId, Value};
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{now_millis, PollingId};
use crate::table::ReferenceTable;

/// Arguments of one event firing, queued for delivery
#[derive(Debug)]
pub struct EventBundle {
    /// Subscription that captured the event
    pub polling_id: PollingId,
    /// Serial of that subscription
    pub serial: u64,
    /// Unix milliseconds at firing
    pub fired_at: i64,
    /// Emitted arguments
    pub args: Vec<Value>,
}

struct Subscription {
    target: Handle,
    event: String,
    emitter: Arc<EventEmitter>,
    listener: ListenerId,
    serial: u64,
}

impl Subscription {
    fn detach_listener(&self) {
        self.emitter.off(&self.event, self.listener);
    }
}

/// Active subscriptions keyed by polling id.
pub struct PollingAdaptor {
    subscriptions: Mutex<HashMap<PollingId, Subscription>>,
    next_serial: AtomicU64,
    events: mpsc::UnboundedSender<EventBundle>,
}

impl PollingAdaptor {
    /// Create an adaptor queueing bundles on `events`
    pub fn new(events: mpsc::UnboundedSender<EventBundle>) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
            events,
        }
    }

    /// Subscribe to `event` on the value behind `target`.
    ///
    /// An active subscription with the same polling id is replaced.
    pub fn start(
        &self,
        table: &ReferenceTable,
        target: Handle,
        event: &str,
        id: PollingId,
    ) -> BridgeResult<()> {
        let value = table.resolve(target)?;
        let emitter = value.emitter().cloned().ok_or_else(|| {
            BridgeError::Invocation(format!(
                "Value at handle {} ({}) cannot emit events",
                target,
                value.type_name()
            ))
        })?;

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let events = self.events.clone();
        let polling_id = id.clone();
        let listener = emitter.on(event, move |args| {
            let bundle = EventBundle {
                polling_id: polling_id.clone(),
                serial,
                fired_at: now_millis(),
                args: args.to_vec(),
            };
            // Closed channel means the session is gone
            let _ = events.send(bundle);
        });

        if let Err(err) = table.attach_polling(target, id.clone()) {
            emitter.off(event, listener);
            return Err(err);
        }

        let replaced = self.subscriptions.lock().insert(
            id.clone(),
            Subscription {
                target,
                event: event.to_string(),
                emitter,
                listener,
                serial,
            },
        );
        if let Some(old) = replaced {
            old.detach_listener();
            if old.target != target {
                table.detach_polling(old.target, &id);
            }
            debug!(polling_id = %id, "replaced subscription");
        }
        debug!(polling_id = %id, %target, event, "subscription started");
        Ok(())
    }

    /// Cancel a subscription. Unknown ids are ignored; returns whether one was active.
    pub fn stop(&self, table: &ReferenceTable, id: &PollingId) -> bool {
        let Some(sub) = self.subscriptions.lock().remove(id) else {
            return false;
        };
        sub.detach_listener();
        table.detach_polling(sub.target, id);
        debug!(polling_id = %id, "subscription stopped");
        true
    }

    /// Check if a bundle still belongs to a live subscription
    pub fn is_current(&self, id: &PollingId, serial: u64) -> bool {
        self.subscriptions
            .lock()
            .get(id)
            .is_some_and(|sub| sub.serial == serial)
    }

    /// Number of active subscriptions
    pub fn active(&self) -> usize {
        self.subscriptions.lock().len()
    }
}
