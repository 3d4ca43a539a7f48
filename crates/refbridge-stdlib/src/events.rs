//! `events` module: the `EventEmitter` class

use std::sync::Arc;

use refbridge_sdk::args::string_arg;
use refbridge_sdk::{BridgeError, BridgeResult, ClassBuilder, EventEmitter, Function, Object, Value};

/// Build the `events` module object
pub fn module() -> Value {
    Value::object(Object::new().with("EventEmitter", event_emitter_class()))
}

fn emitter_of(this: &Value, method: &str) -> BridgeResult<Arc<EventEmitter>> {
    this.emitter()
        .cloned()
        .ok_or_else(|| {
            BridgeError::Invocation(format!("{}: receiver is not an EventEmitter", method))
        })
}

/// The `EventEmitter` class: instances carry their own emitter capability
pub fn event_emitter_class() -> Function {
    ClassBuilder::new("EventEmitter")
        .with_emitter()
        .method("emit", |this, args| {
            let emitter = emitter_of(&this, "emit")?;
            let event = string_arg(&args, 0, "emit")?;
            Ok(Value::Bool(emitter.emit(&event, &args[1..])))
        })
        .method("listenerCount", |this, args| {
            let emitter = emitter_of(&this, "listenerCount")?;
            let event = string_arg(&args, 0, "listenerCount")?;
            Ok(Value::from(emitter.listener_count(&event)))
        })
        .method("eventNames", |this, _args| {
            let emitter = emitter_of(&this, "eventNames")?;
            Ok(Value::array(emitter.event_names().into_iter().map(Value::from).collect()))
        })
        .method("removeAllListeners", |this, args| {
            let emitter = emitter_of(&this, "removeAllListeners")?;
            match args.first() {
                None | Some(Value::Undefined) => emitter.remove_all_listeners(None),
                Some(_) => {
                    let event = string_arg(&args, 0, "removeAllListeners")?;
                    emitter.remove_all_listeners(Some(&event));
                }
            }
            Ok(this)
        })
        .build()
}
