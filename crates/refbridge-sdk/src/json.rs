//! JSON conversion for live values
//!
//! `from_json` turns literal request arguments into values. `to_json` and
//! `stringify` encode a value the way `JSON.stringify` does:
//! - object members holding `undefined` or functions are omitted
//! - array slots holding them become `null`
//! - non-finite numbers become `null`, integral numbers have no fraction
//! - numeric wrapper objects encode as their number
//! - bigints and circular structures are errors

use serde_json::{Map, Number};

use crate::error::BridgeError;
use crate::value::{Object, Value};

/// Largest integer magnitude a double represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert a JSON literal into a live value
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Value::object(Object::from_entries(map.iter().map(|(k, v)| (k.clone(), from_json(v)))))
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        from_json(&json)
    }
}

/// Encode a double as a JSON number.
///
/// Integral values within the safe range are written without a fraction;
/// non-finite values become `null`.
pub fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        // -0 encodes as 0
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

/// Encode a value as a JSON tree.
///
/// Returns `Ok(None)` when the value has no JSON form at all (top-level
/// `undefined` or function).
pub fn to_json(value: &Value) -> Result<Option<serde_json::Value>, BridgeError> {
    let mut encoder = Encoder { stack: Vec::new() };
    encoder.encode(value)
}

/// Encode a value as JSON text (`None` when it has no JSON form)
pub fn stringify(value: &Value) -> Result<Option<String>, BridgeError> {
    match to_json(value)? {
        Some(tree) => serde_json::to_string(&tree)
            .map(Some)
            .map_err(|e| BridgeError::Serialization(e.to_string())),
        None => Ok(None),
    }
}

struct Encoder {
    /// Identities of the composites currently being encoded
    stack: Vec<usize>,
}

impl Encoder {
    fn encode(&mut self, value: &Value) -> Result<Option<serde_json::Value>, BridgeError> {
        let json = match value {
            Value::Undefined | Value::Function(_) => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::BigInt(_) => {
                return Err(BridgeError::Serialization(
                    "Do not know how to serialize a BigInt".to_string(),
                ))
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Promise(_) => serde_json::Value::Object(Map::new()),
            Value::Array(items) => {
                let snapshot = items.read().clone();
                self.enter(value)?;
                let mut out = Vec::with_capacity(snapshot.len());
                for item in &snapshot {
                    out.push(self.encode(item)?.unwrap_or(serde_json::Value::Null));
                }
                self.leave();
                serde_json::Value::Array(out)
            }
            Value::Object(obj) => {
                if let Some(n) = obj.primitive() {
                    return Ok(Some(number_to_json(n)));
                }
                self.enter(value)?;
                let mut out = Map::new();
                for (key, member) in obj.entries() {
                    if let Some(json) = self.encode(&member)? {
                        out.insert(key, json);
                    }
                }
                self.leave();
                serde_json::Value::Object(out)
            }
        };
        Ok(Some(json))
    }

    fn enter(&mut self, value: &Value) -> Result<(), BridgeError> {
        let Some(id) = value.identity() else {
            return Ok(());
        };
        if self.stack.contains(&id) {
            return Err(BridgeError::Serialization(
                "Converting circular structure to JSON".to_string(),
            ));
        }
        self.stack.push(id);
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}
