//! Request dispatcher
//!
//! Executes one decoded request against a session and produces exactly one
//! reply. Every failure, including a panic inside a native function,
//! becomes an error reply.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use refbridge_sdk::inspect::inspect;
use refbridge_sdk::json::stringify;
use refbridge_sdk::{BridgeError, BridgeResult, Handle, Object, Value};
use serde_json::Value as Json;
use tracing::debug;

use crate::classify::{classify, scalar_json, WireTag};
use crate::protocol::{Action, Arg, AttributeKey, Outbound, Request};
use crate::session::Session;

impl Session {
    /// Execute a request and build its reply
    pub async fn handle(&self, request: Request) -> Outbound {
        let r = request.r;
        debug!(r, action = %request.action, ffid = %request.ffid, key = ?request.key, "request");
        let outcome = AssertUnwindSafe(self.dispatch(request)).catch_unwind().await;
        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => Outbound::error(r, &err),
            Err(panic) => Outbound::error(r, &BridgeError::Invocation(panic_message(panic))),
        };
        debug!(r, reply = ?reply, "reply");
        reply
    }

    async fn dispatch(&self, request: Request) -> BridgeResult<Outbound> {
        let Request {
            r,
            action,
            ffid,
            key,
            args,
        } = request;
        let target = self.table().resolve(ffid)?;
        match action {
            Action::Get => {
                let key =
                    key.ok_or_else(|| BridgeError::Protocol("get requires a key".to_string()))?;
                self.get(r, ffid, &target, &key).await
            }
            Action::Call => {
                let args = self.resolve_args(args)?;
                self.call(r, target, key, args).await
            }
            Action::Init => {
                let args = self.resolve_args(args)?;
                self.init(r, target, key, args).await
            }
            Action::Inspect => {
                let value = settle(target).await?;
                Ok(Outbound::plain(r, Json::String(inspect(&value))))
            }
            Action::Serialize => {
                let value = settle(target).await?;
                let text = stringify(&value)?;
                Ok(Outbound::plain(r, text.map_or(Json::Null, Json::String)))
            }
            Action::Free => {
                self.free(ffid)?;
                Ok(Outbound::plain(r, Json::Bool(true)))
            }
        }
    }

    /// Read an attribute. Callables reply with the target's own handle.
    async fn get(
        &self,
        r: u64,
        ffid: Handle,
        target: &Value,
        key: &AttributeKey,
    ) -> BridgeResult<Outbound> {
        let value = settle(target.get(&key.property()).unwrap_or_default()).await?;
        let tag = classify(&value);
        Ok(match tag {
            WireTag::Obj => self.reply_with_handle(r, tag, value),
            WireTag::Class | WireTag::Fn => Outbound::reply(r, tag, Json::from(ffid.get())),
            _ => Outbound::reply(r, tag, scalar_json(&value, tag)),
        })
    }

    /// Invoke an attribute (or the target itself when `key` is `None`)
    async fn call(
        &self,
        r: u64,
        target: Value,
        key: Option<AttributeKey>,
        args: Vec<Value>,
    ) -> BridgeResult<Outbound> {
        let (this, callee, name) = lookup(target, key)?;
        let pending = callee
            .as_function()
            .and_then(|f| f.call(this, args))
            .ok_or_else(|| BridgeError::not_callable(name))?;
        let value = settle(pending.await?).await?;

        let tag = classify(&value);
        Ok(match tag {
            // A bare callable cannot travel back; wrap it so it stays invocable
            WireTag::Fn => {
                let holder = Value::object(Object::new().with("call", value));
                self.reply_with_handle(r, WireTag::Obj, holder)
            }
            WireTag::Obj | WireTag::Class => self.reply_with_handle(r, tag, value),
            _ => Outbound::reply(r, tag, scalar_json(&value, tag)),
        })
    }

    /// Construct from an attribute (or the target itself when `key` is `None`)
    async fn init(
        &self,
        r: u64,
        target: Value,
        key: Option<AttributeKey>,
        args: Vec<Value>,
    ) -> BridgeResult<Outbound> {
        let (_, constructor, name) = lookup(target, key)?;
        let pending = constructor
            .as_function()
            .and_then(|f| f.construct(args))
            .ok_or_else(|| BridgeError::not_callable(name))?;
        let instance = settle(pending.await?).await?;
        Ok(self.reply_with_handle(r, WireTag::Obj, instance))
    }

    fn reply_with_handle(&self, r: u64, tag: WireTag, value: Value) -> Outbound {
        let handle = self.table().allocate(value);
        Outbound::reply(r, tag, Json::from(handle.get()))
    }

    /// Literal arguments become values; `{ffid}` markers resolve through the table
    fn resolve_args(&self, args: Vec<Arg>) -> BridgeResult<Vec<Value>> {
        args.into_iter()
            .map(|arg| match arg {
                Arg::Literal(json) => Ok(Value::from(json)),
                Arg::Ref(handle) => self.table().resolve(handle),
            })
            .collect()
    }
}

/// Resolve the invocation target: `(this, callee, name for errors)`
fn lookup(target: Value, key: Option<AttributeKey>) -> BridgeResult<(Value, Value, String)> {
    match key {
        Some(key) => {
            let name = key.to_string();
            let callee = target
                .get(&key.property())
                .ok_or_else(|| BridgeError::attribute_not_found(name.clone()))?;
            Ok((target, callee, name))
        }
        None => {
            let name = match &target {
                Value::Function(f) => f.name().to_string(),
                other => other.type_name().to_string(),
            };
            Ok((Value::Undefined, target, name))
        }
    }
}

/// Await pending results until a settled value remains
async fn settle(mut value: Value) -> BridgeResult<Value> {
    while let Value::Promise(promise) = value {
        value = promise.settle().await?;
    }
    Ok(value)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s.clone();
    }
    "native function panicked".to_string()
}
