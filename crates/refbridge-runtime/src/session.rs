//! Bridge session
//!
//! A `Session` owns everything one counterpart can reach: the reference
//! table (seeded with the root namespace at handle 0), the event
//! subscriptions and the outbound message channel. Several sessions can
//! coexist in one process.
//!
//! # Example
//!
//! ```rust,ignore
//! use refbridge_runtime::{BridgeConfig, Session};
//!
//! let session = Session::new(BridgeConfig::default());
//! let outbound = session.take_outbound().unwrap();
//! ```

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use refbridge_sdk::args::{arg, string_arg};
use refbridge_sdk::{BridgeError, BridgeResult, Function, Handle, Object, Value};
use refbridge_stdlib::console::console_object;
use refbridge_stdlib::{register_builtin, ConsoleTarget, ModuleRegistry};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::polling::{EventBundle, PollingAdaptor};
use crate::protocol::{Outbound, PollingId};
use crate::table::ReferenceTable;

/// One bridge session.
pub struct Session {
    /// Handle-to-value mapping
    table: ReferenceTable,

    /// Event subscriptions
    polling: PollingAdaptor,

    /// Replies and notifications, in send order
    outbound: mpsc::UnboundedSender<Outbound>,

    /// Receiving end, until a serve loop claims it
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,

    config: BridgeConfig,
}

impl Session {
    /// Create a session whose `require` loads the configured built-in modules.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: BridgeConfig) -> Arc<Self> {
        let mut modules = ModuleRegistry::new();
        for name in &config.modules {
            if !register_builtin(&mut modules, name) {
                warn!(module = %name, "unknown built-in module, skipped");
            }
        }
        Self::with_modules(config, modules)
    }

    /// Create a session with an explicit module registry.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_modules(config: BridgeConfig, modules: ModuleRegistry) -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let modules = Arc::new(modules);
        let console = config.console();

        let session = Arc::new_cyclic(|weak| Session {
            table: ReferenceTable::new(root_namespace(weak, console, modules)),
            polling: PollingAdaptor::new(events_tx),
            outbound,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            config,
        });
        tokio::spawn(pump(Arc::downgrade(&session), events_rx));
        info!("session started");
        session
    }

    /// Reference table
    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Session configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Claim the outbound channel. Only the first caller gets it.
    pub fn take_outbound(&self) -> Option<mpsc::UnboundedReceiver<Outbound>> {
        self.outbound_rx.lock().take()
    }

    /// Queue an outbound message
    pub fn send(&self, message: Outbound) {
        if self.outbound.send(message).is_err() {
            debug!("outbound channel closed, message dropped");
        }
    }

    /// Subscribe to `event` on the value at `target`
    pub fn start_polling(&self, target: Handle, event: &str, id: PollingId) -> BridgeResult<()> {
        self.polling.start(&self.table, target, event, id)
    }

    /// Cancel a subscription; unknown ids are a no-op
    pub fn stop_polling(&self, id: &PollingId) -> bool {
        self.polling.stop(&self.table, id)
    }

    /// Number of active subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.polling.active()
    }

    /// Release a handle, stopping every subscription that targets it
    pub fn free(&self, handle: Handle) -> BridgeResult<()> {
        self.table
            .release_with(handle, |id| {
                self.polling.stop(&self.table, id);
            })
            .map(|_| ())
    }

    fn deliver(&self, bundle: EventBundle) {
        if !self.polling.is_current(&bundle.polling_id, bundle.serial) {
            debug!(polling_id = %bundle.polling_id, "dropping event for stopped subscription");
            return;
        }
        let handle = self.table.allocate(Value::array(bundle.args));
        self.send(Outbound::notification(bundle.fired_at, bundle.polling_id, handle));
    }
}

/// Drain queued event bundles into notifications until the session is gone
async fn pump(session: Weak<Session>, mut events: mpsc::UnboundedReceiver<EventBundle>) {
    while let Some(bundle) = events.recv().await {
        let Some(session) = session.upgrade() else {
            break;
        };
        session.deliver(bundle);
    }
}

// ============================================================================
// Root namespace
// ============================================================================

fn root_namespace(
    session: &Weak<Session>,
    console: ConsoleTarget,
    modules: Arc<ModuleRegistry>,
) -> Value {
    let require = Function::native("require", move |_this, args| {
        let name = string_arg(&args, 0, "require")?;
        modules.load(&name)
    });

    let weak = session.clone();
    let start = Function::native("start", move |_this, args| {
        let session = upgrade(&weak)?;
        let target = handle_arg(&arg(&args, 0))?;
        let event = string_arg(&args, 1, "start")?;
        let id = PollingId::from_value(&arg(&args, 2))?;
        session.start_polling(target, &event, id)?;
        Ok(Value::Bool(true))
    });

    let weak = session.clone();
    let stop = Function::native("stop", move |_this, args| {
        let session = upgrade(&weak)?;
        let id = PollingId::from_value(&arg(&args, 0))?;
        session.stop_polling(&id);
        Ok(Value::Undefined)
    });

    Value::object(
        Object::new()
            .with("console", console_object(console))
            .with("require", require)
            .with("start", start)
            .with("stop", stop),
    )
}

fn upgrade(session: &Weak<Session>) -> BridgeResult<Arc<Session>> {
    session
        .upgrade()
        .ok_or_else(|| BridgeError::Invocation("session has ended".to_string()))
}

/// Polling targets are passed as numeric handle literals
fn handle_arg(value: &Value) -> BridgeResult<Handle> {
    match value {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64 => {
            Ok(Handle(*n as u64))
        }
        other => Err(BridgeError::Invocation(format!(
            "start: target must be a numeric handle, got {}",
            other.type_name()
        ))),
    }
}
