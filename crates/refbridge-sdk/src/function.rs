//! Native functions and constructors
//!
//! A `Function` may be callable, constructible, or both. Its shape decides
//! how it is classified on the wire: a function exposing a `prototype` and
//! carrying no bound-arguments marker is a class, anything else is a plain
//! function.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::BridgeError;
use crate::value::{ObjectRef, Value};

/// Native function body.
///
/// Receives the `this` value and the argument list, and returns a future
/// resolving to the result. Synchronous bodies return a ready future.
pub type NativeFn =
    Arc<dyn Fn(Value, Vec<Value>) -> BoxFuture<'static, Result<Value, BridgeError>> + Send + Sync>;

/// A callable and/or constructible value.
pub struct Function {
    name: String,
    call: Option<NativeFn>,
    construct: Option<NativeFn>,
    prototype: Option<ObjectRef>,
    bound_args: Option<Vec<Value>>,
    statics: RwLock<IndexMap<String, Value>>,
}

impl Function {
    /// Create a callable function from a synchronous body
    pub fn native<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        let call: NativeFn = Arc::new(move |this: Value, args: Vec<Value>| {
            let result = body(this, args);
            async move { result }.boxed()
        });
        Self::from_parts(name.into(), Some(call), None, None)
    }

    /// Create a callable function from an asynchronous body
    pub fn native_async<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Value, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BridgeError>> + Send + 'static,
    {
        let call: NativeFn =
            Arc::new(move |this: Value, args: Vec<Value>| body(this, args).boxed());
        Self::from_parts(name.into(), Some(call), None, None)
    }

    /// Create a constructor (not callable without construction)
    pub fn constructor(name: impl Into<String>, construct: NativeFn, prototype: ObjectRef) -> Self {
        Self::from_parts(name.into(), None, Some(construct), Some(prototype))
    }

    fn from_parts(
        name: String,
        call: Option<NativeFn>,
        construct: Option<NativeFn>,
        prototype: Option<ObjectRef>,
    ) -> Self {
        Self {
            name,
            call,
            construct,
            prototype,
            bound_args: None,
            statics: RwLock::new(IndexMap::new()),
        }
    }

    /// Builder: give the function a `prototype` member
    pub fn with_prototype(mut self, prototype: ObjectRef) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Builder: add a static property
    pub fn with_static(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.write().insert(key.into(), value.into());
        self
    }

    /// Bind `this` and leading arguments, producing a bound function.
    ///
    /// Bound functions carry the bound-arguments marker and never expose a
    /// prototype of their own.
    pub fn bind(self: &Arc<Self>, this: Value, leading: Vec<Value>) -> Function {
        let call = self.call.as_ref().map(|_| {
            let target = Arc::clone(self);
            let this = this.clone();
            let leading = leading.clone();
            let f: NativeFn = Arc::new(move |_ignored: Value, args: Vec<Value>| {
                let mut all = leading.clone();
                all.extend(args);
                match target.call(this.clone(), all) {
                    Some(fut) => fut,
                    None => {
                        let err = BridgeError::not_callable(target.name.clone());
                        async move { Err(err) }.boxed()
                    }
                }
            });
            f
        });
        let construct = self.construct.as_ref().map(|_| {
            let target = Arc::clone(self);
            let leading = leading.clone();
            let f: NativeFn = Arc::new(move |_ignored: Value, args: Vec<Value>| {
                let mut all = leading.clone();
                all.extend(args);
                match target.construct(all) {
                    Some(fut) => fut,
                    None => {
                        let err = BridgeError::not_callable(target.name.clone());
                        async move { Err(err) }.boxed()
                    }
                }
            });
            f
        });
        Function {
            name: format!("bound {}", self.name),
            call,
            construct,
            prototype: None,
            bound_args: Some(leading),
            statics: RwLock::new(IndexMap::new()),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prototype member, if any
    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    /// Check for the bound-arguments marker
    pub fn is_bound(&self) -> bool {
        self.bound_args.is_some()
    }

    /// Check if the function can be called
    pub fn is_callable(&self) -> bool {
        self.call.is_some()
    }

    /// Check if the function can be constructed
    pub fn is_constructor(&self) -> bool {
        self.construct.is_some()
    }

    /// Read a static property, `name` or `prototype`
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.statics.read().get(key) {
            return Some(v.clone());
        }
        match key {
            "name" => Some(Value::String(self.name.clone())),
            "prototype" => self.prototype.clone().map(Value::Object),
            _ => None,
        }
    }

    /// Invoke as an ordinary function. `None` if not callable.
    pub fn call(
        &self,
        this: Value,
        args: Vec<Value>,
    ) -> Option<BoxFuture<'static, Result<Value, BridgeError>>> {
        self.call.as_ref().map(|f| f(this, args))
    }

    /// Invoke as a constructor. `None` if not constructible.
    pub fn construct(
        &self,
        args: Vec<Value>,
    ) -> Option<BoxFuture<'static, Result<Value, BridgeError>>> {
        self.construct.as_ref().map(|f| f(Value::Undefined, args))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("callable", &self.call.is_some())
            .field("constructor", &self.construct.is_some())
            .field("prototype", &self.prototype.is_some())
            .field("bound", &self.bound_args.is_some())
            .finish()
    }
}
