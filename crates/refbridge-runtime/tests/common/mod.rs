//! Shared harness for session integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use refbridge_runtime::protocol::{decode_line, Decoded, Outbound};
use refbridge_runtime::{BridgeConfig, Session};
use refbridge_sdk::args::{arg, number_arg};
use refbridge_sdk::inspect::inspect;
use refbridge_sdk::{BridgeError, ClassBuilder, Function, NativeFn, Object, Value};
use refbridge_stdlib::{register_stdlib, ConsoleBuffer, ConsoleTarget, ModuleRegistry};
use serde_json::{json, Value as Json};
use tokio::sync::mpsc;

/// Values the tests reach through `require('fixtures')`
pub fn fixtures() -> Value {
    let point = Value::function(
        ClassBuilder::new("Point")
            .initializer(|this, args| {
                this.insert("x", arg(&args, 0));
                this.insert("y", arg(&args, 1));
                Ok(())
            })
            .method("sum", |this, _args| {
                let x = this.get("x").unwrap_or_default().to_number();
                let y = this.get("y").unwrap_or_default().to_number();
                Ok(Value::Number(x + y))
            })
            .build(),
    );
    let point_class = point.clone();

    // A constructor whose product is itself callable
    let make_callable: NativeFn = Arc::new(|_this: Value, _args: Vec<Value>| {
        let made = Function::native("made", |_, _| Ok(Value::Undefined));
        async { Ok::<_, BridgeError>(Value::function(made)) }.boxed()
    });

    Value::object(
        Object::new()
            .with("greeting", "hi")
            .with("answer", 42)
            .with("numericText", "17")
            .with("big", Value::BigInt(1 << 60))
            .with("record", Object::new().with("a", 1))
            .with(
                "nested",
                Object::new().with("x", 1).with("y", Value::array(vec![1.into(), 2.into()])),
            )
            .with("list", Value::array(vec!["zero".into(), "one".into()]))
            .with("empty", Value::array(vec![]))
            .with("single", Value::array(vec!["7".into()]))
            .with("blank", "")
            .with("Point", point)
            .with("pointClass", Function::native("pointClass", move |_, _| Ok(point_class.clone())))
            .with(
                "makeAdder",
                Function::native("makeAdder", |_, args| {
                    let base = number_arg(&args, 0, "makeAdder")?;
                    Ok(Value::function(Function::native("adder", move |_, args| {
                        Ok(Value::Number(base + arg(&args, 0).to_number()))
                    })))
                }),
            )
            .with(
                "describe",
                Function::native("describe", |_, args| Ok(Value::String(inspect(&arg(&args, 0))))),
            )
            .with(
                "CallableFactory",
                Function::constructor("CallableFactory", make_callable, Arc::new(Object::new())),
            )
            .with(
                "fail",
                Function::native("fail", |_, _| Err(BridgeError::from("deliberate failure"))),
            ),
    )
}

/// Drives a session request by request
pub struct Harness {
    pub session: Arc<Session>,
    pub console: ConsoleBuffer,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    next_r: u64,
}

impl Harness {
    pub fn new() -> Self {
        let console = ConsoleBuffer::default();
        let target = ConsoleTarget::Buffer(Arc::clone(&console));
        let config = BridgeConfig::default().with_console_target(target);
        let mut modules = ModuleRegistry::new();
        register_stdlib(&mut modules);
        modules.register("fixtures", fixtures);
        let session = Session::with_modules(config, modules);
        let outbound = session.take_outbound().expect("fresh session");
        Self {
            session,
            console,
            outbound,
            next_r: 0,
        }
    }

    pub async fn request(&mut self, action: &str, ffid: u64, key: Json, args: Json) -> Json {
        self.next_r += 1;
        let message = json!({
            "r": self.next_r,
            "action": action,
            "ffid": ffid,
            "key": key,
            "args": args,
        });
        let line = message.to_string();
        let Decoded::Request(request) = decode_line(&line) else {
            panic!("harness produced an undecodable line: {}", line);
        };
        let reply = serde_json::to_value(self.session.handle(request).await).unwrap();
        assert_eq!(reply["r"], self.next_r);
        reply
    }

    pub async fn get(&mut self, ffid: u64, key: &str) -> Json {
        self.request("get", ffid, json!(key), Json::Null).await
    }

    pub async fn call(&mut self, ffid: u64, key: &str, args: Json) -> Json {
        self.request("call", ffid, json!(key), args).await
    }

    pub async fn init(&mut self, ffid: u64, key: &str, args: Json) -> Json {
        self.request("init", ffid, json!(key), args).await
    }

    /// Handle of `require(name)`
    pub async fn require(&mut self, name: &str) -> u64 {
        let reply = self.call(0, "require", json!([name])).await;
        assert_eq!(reply["key"], "obj", "{}", reply);
        handle(&reply)
    }

    /// A fresh `EventEmitter` instance
    pub async fn emitter(&mut self) -> u64 {
        let events = self.require("events").await;
        let reply = self.init(events, "EventEmitter", json!([])).await;
        handle(&reply)
    }

    pub async fn notification(&mut self) -> Json {
        let message = tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("outbound channel closed");
        serde_json::to_value(message).unwrap()
    }

    /// Assert that no notification arrives within a short grace period
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(self.outbound.try_recv().is_err(), "unexpected notification");
    }
}

/// Handle carried by a reply
pub fn handle(reply: &Json) -> u64 {
    reply["val"]
        .as_u64()
        .unwrap_or_else(|| panic!("reply carries no handle: {}", reply))
}
