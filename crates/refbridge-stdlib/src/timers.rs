//! `timers` module: promise-returning delays

use std::time::Duration;

use refbridge_sdk::args::{arg, number_arg};
use refbridge_sdk::{BridgeResult, Function, Object, Promise, Value};

/// Build the `timers` module object
pub fn module() -> Value {
    Value::object(
        Object::new()
            .with(
                "sleep",
                Function::native("sleep", |_this, args| {
                    let wait = duration_arg(&args, "sleep")?;
                    Ok(Value::Promise(delayed(wait, Value::Undefined)))
                }),
            )
            .with(
                "delay",
                Function::native("delay", |_this, args| {
                    let wait = duration_arg(&args, "delay")?;
                    Ok(Value::Promise(delayed(wait, arg(&args, 1))))
                }),
            ),
    )
}

/// Negative and non-finite waits clamp to zero
fn duration_arg(args: &[Value], context: &str) -> BridgeResult<Duration> {
    let ms = number_arg(args, 0, context)?;
    if !ms.is_finite() || ms <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_secs_f64(ms / 1000.0))
}

fn delayed(wait: Duration, value: Value) -> Promise {
    Promise::new(async move {
        tokio::time::sleep(wait).await;
        Ok(value)
    })
}
