//! Argument extraction helpers for native functions

use crate::error::{BridgeError, BridgeResult};
use crate::value::Value;

/// Argument at `index`, or `undefined` when absent
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Require a string argument
pub fn string_arg(args: &[Value], index: usize, context: &str) -> BridgeResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(BridgeError::Invocation(format!(
            "{}: argument {} must be a string, got {}",
            context,
            index,
            other.type_name()
        ))),
        None => Err(BridgeError::Invocation(format!(
            "{}: missing argument {}",
            context, index
        ))),
    }
}

/// Require an argument with a numeric reading
pub fn number_arg(args: &[Value], index: usize, context: &str) -> BridgeResult<f64> {
    let value = args.get(index).ok_or_else(|| {
        BridgeError::Invocation(format!("{}: missing argument {}", context, index))
    })?;
    let n = value.to_number();
    if n.is_nan() {
        return Err(BridgeError::Invocation(format!(
            "{}: argument {} must be a number, got {}",
            context,
            index,
            value.type_name()
        )));
    }
    Ok(n)
}
