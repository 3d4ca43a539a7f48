//! Module registry behind `require`
//!
//! Maps a module name to a factory producing the module object. A module is
//! built on first load and cached, so repeated loads return the same live
//! object.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use refbridge_sdk::{BridgeError, BridgeResult, Value};
use tracing::debug;

/// Produces a module object
pub type ModuleFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Names of the built-in modules
pub const BUILTIN_MODULES: &[&str] = &["events", "timers", "util"];

/// Registry of loadable modules indexed by name.
pub struct ModuleRegistry {
    factories: IndexMap<String, ModuleFactory>,
    loaded: Mutex<HashMap<String, Value>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    /// Register a module by name, replacing any previous factory
    pub fn register(&mut self, name: &str, factory: impl Fn() -> Value + Send + Sync + 'static) {
        self.factories.insert(name.to_string(), Arc::new(factory));
        self.loaded.lock().remove(name);
    }

    /// Load a module, building it on first use
    pub fn load(&self, name: &str) -> BridgeResult<Value> {
        if let Some(module) = self.loaded.lock().get(name) {
            return Ok(module.clone());
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BridgeError::Invocation(format!("Cannot find module '{}'", name)))?;

        debug!(module = name, "loading module");
        let module = factory();
        // Another load may have raced us; keep whichever landed first.
        let mut loaded = self.loaded.lock();
        Ok(loaded.entry(name.to_string()).or_insert(module).clone())
    }

    /// Check if a module is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered module names in registration order
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Get the number of registered modules
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register every built-in module
pub fn register_stdlib(registry: &mut ModuleRegistry) {
    for name in BUILTIN_MODULES {
        register_builtin(registry, name);
    }
}

/// Register one built-in module by name. Returns false for unknown names.
pub fn register_builtin(registry: &mut ModuleRegistry, name: &str) -> bool {
    match name {
        "events" => registry.register("events", crate::events::module),
        "timers" => registry.register("timers", crate::timers::module),
        "util" => registry.register("util", crate::util::module),
        _ => return false,
    }
    true
}
