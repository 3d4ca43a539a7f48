//! Class construction helper
//!
//! A class is a constructor `Function` with a prototype object holding its
//! methods. Constructing it yields an instance whose property reads fall
//! back to that prototype.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::emitter::EventEmitter;
use crate::error::BridgeError;
use crate::function::{Function, NativeFn};
use crate::value::{Object, ObjectRef, Value};

/// Instance initializer: receives the fresh instance and the constructor arguments
pub type Initializer = Arc<dyn Fn(&ObjectRef, Vec<Value>) -> Result<(), BridgeError> + Send + Sync>;

/// Builder for native classes.
pub struct ClassBuilder {
    name: String,
    prototype: Object,
    statics: Vec<(String, Value)>,
    initializer: Option<Initializer>,
    emitter: bool,
}

impl ClassBuilder {
    /// Start a class with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prototype: Object::new(),
            statics: Vec::new(),
            initializer: None,
            emitter: false,
        }
    }

    /// Add a synchronous prototype method
    pub fn method<F>(self, name: &str, body: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.prototype.insert(name, Function::native(name, body));
        self
    }

    /// Add an asynchronous prototype method
    pub fn async_method<F, Fut>(self, name: &str, body: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BridgeError>> + Send + 'static,
    {
        self.prototype.insert(name, Function::native_async(name, body));
        self
    }

    /// Add a static property on the constructor
    pub fn static_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.push((name.into(), value.into()));
        self
    }

    /// Set the instance initializer
    pub fn initializer<F>(mut self, init: F) -> Self
    where
        F: Fn(&ObjectRef, Vec<Value>) -> Result<(), BridgeError> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(init));
        self
    }

    /// Give every instance its own event-emission capability
    pub fn with_emitter(mut self) -> Self {
        self.emitter = true;
        self
    }

    /// Finish the class
    pub fn build(self) -> Function {
        let prototype: ObjectRef = Arc::new(self.prototype);
        let name = self.name.clone();
        let proto = Arc::clone(&prototype);
        let initializer = self.initializer;
        let emitter = self.emitter;

        let construct: NativeFn = Arc::new(move |_this: Value, args: Vec<Value>| {
            let mut instance = Object::with_class(name.clone()).with_prototype(Arc::clone(&proto));
            if emitter {
                instance = instance.with_emitter(Arc::new(EventEmitter::new()));
            }
            let instance = Arc::new(instance);
            let result = match &initializer {
                Some(init) => init(&instance, args).map(|()| Value::Object(instance)),
                None => Ok(Value::Object(instance)),
            };
            async move { result }.boxed()
        });

        self.statics.into_iter().fold(
            Function::constructor(self.name, construct, prototype),
            |f, (k, v)| f.with_static(k, v),
        )
    }
}
