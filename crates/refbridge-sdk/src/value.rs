//! Dynamic live value representation
//!
//! Primitives are stored inline. Arrays, objects and functions are shared
//! behind an `Arc` with interior mutability, so the reference table, a
//! property slot and an event bundle that hold the same value all observe
//! the same live state.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::emitter::EventEmitter;
use crate::function::Function;
use crate::promise::Promise;

/// Shared, mutable array storage
pub type ArrayRef = Arc<RwLock<Vec<Value>>>;

/// Shared object
pub type ObjectRef = Arc<Object>;

/// Shared function or class
pub type FunctionRef = Arc<Function>;

/// A live value owned by the bridge.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// IEEE 754 double
    Number(f64),
    /// Wide integer, the arbitrary-precision integer class of this model
    BigInt(i128),
    /// UTF-8 text
    String(String),
    /// Ordered list
    Array(ArrayRef),
    /// Record with ordered properties
    Object(ObjectRef),
    /// Callable and/or constructible
    Function(FunctionRef),
    /// Pending asynchronous result
    Promise(Promise),
}

impl Value {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    /// Create an object value
    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Create a function value
    pub fn function(function: Function) -> Self {
        Value::Function(Arc::new(function))
    }

    // ========================================================================
    // Type checks and accessors
    // ========================================================================

    /// Name of the value's type, as reported in messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Promise(_) => "promise",
        }
    }

    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null or undefined
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Get as string slice if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as f64 if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as bool if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the shared object if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the shared array if this is an array
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the shared function if this is a function
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Event-emission capability, if the value carries one
    pub fn emitter(&self) -> Option<&Arc<EventEmitter>> {
        self.as_object().and_then(|o| o.emitter())
    }

    /// Identity of a shared value (used for cycle detection)
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(Arc::as_ptr(a) as *const () as usize),
            Value::Object(o) => Some(Arc::as_ptr(o) as *const () as usize),
            Value::Function(f) => Some(Arc::as_ptr(f) as *const () as usize),
            _ => None,
        }
    }

    // ========================================================================
    // Coercion
    // ========================================================================

    /// Numeric coercion.
    ///
    /// Returns NaN when the value has no numeric reading. Blank strings are
    /// 0, other strings coerce when their trimmed text is a numeric literal.
    /// Arrays read through their text form: empty is 0, a single element
    /// coerces as its text, longer arrays are NaN. Objects coerce only when
    /// they box a numeric primitive.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Null => 0.0,
            Value::String(s) => parse_numeric_text(s),
            Value::Array(items) => array_to_number(items, &mut Vec::new()),
            Value::Object(o) => o.primitive().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    // ========================================================================
    // Property access
    // ========================================================================

    /// Read a property.
    ///
    /// Objects look up own properties then the prototype chain. Arrays and
    /// strings expose `length`; arrays also expose integer indices.
    /// Functions expose their statics, `name` and `prototype`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(o) => o.get(key),
            Value::Array(a) => {
                let items = a.read();
                if key == "length" {
                    return Some(Value::Number(items.len() as f64));
                }
                key.parse::<usize>().ok().and_then(|i| items.get(i).cloned())
            }
            Value::String(s) if key == "length" => {
                Some(Value::Number(s.encode_utf16().count() as f64))
            }
            Value::Function(f) => f.get(key),
            _ => None,
        }
    }
}

/// Coerce an array through its joined text.
///
/// `seen` holds the arrays already being read; a cyclic reference joins as
/// empty text.
fn array_to_number(items: &ArrayRef, seen: &mut Vec<usize>) -> f64 {
    let id = Arc::as_ptr(items) as *const () as usize;
    if seen.contains(&id) {
        return 0.0;
    }
    let items = items.read();
    match items.as_slice() {
        [] => 0.0,
        [only] => {
            seen.push(id);
            let n = element_to_number(only, seen);
            seen.pop();
            n
        }
        _ => f64::NAN,
    }
}

/// Number read back from the text form of a lone array element
fn element_to_number(value: &Value, seen: &mut Vec<usize>) -> f64 {
    match value {
        Value::Undefined | Value::Null => 0.0,
        Value::Number(n) => *n,
        Value::BigInt(n) => *n as f64,
        Value::String(s) => parse_numeric_text(s),
        Value::Array(inner) => array_to_number(inner, seen),
        Value::Object(o) => o.primitive().unwrap_or(f64::NAN),
        // "true", "false" and function or promise text never parse
        Value::Bool(_) | Value::Function(_) | Value::Promise(_) => f64::NAN,
    }
}

/// Parse the text of a string under numeric coercion rules.
fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    let (sign, body) = match trimmed.as_bytes().first() {
        None => return 0.0,
        Some(b'-') => (-1.0, &trimmed[1..]),
        Some(b'+') => (1.0, &trimmed[1..]),
        Some(_) => (1.0, trimmed),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }

    let radix = match body.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        // Signed radix literals do not coerce
        if body.len() != trimmed.len() {
            return f64::NAN;
        }
        return parse_radix_digits(&body[2..], radix);
    }

    let starts_like_number = body
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_digit() || b == b'.');
    let numeric_chars = body
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !starts_like_number || !numeric_chars {
        return f64::NAN;
    }
    body.parse::<f64>().map(|n| sign * n).unwrap_or(f64::NAN)
}

/// Digits after a radix prefix; anything but digits of `radix` is NaN
fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0, |acc: f64, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::inspect::inspect(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::object(o)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::function(f)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

// ============================================================================
// Object
// ============================================================================

/// A record with ordered own properties.
///
/// Insertion order is the enumeration order used by inspection and JSON
/// serialization. Property reads fall back to the prototype chain.
#[derive(Default)]
pub struct Object {
    class_name: Option<String>,
    properties: RwLock<IndexMap<String, Value>>,
    prototype: Option<ObjectRef>,
    primitive: Option<f64>,
    emitter: Option<Arc<EventEmitter>>,
}

impl Object {
    /// Create an empty plain object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty instance of a named class
    pub fn with_class(name: impl Into<String>) -> Self {
        Self {
            class_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Create a plain object from key/value pairs
    pub fn from_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let properties = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            properties: RwLock::new(properties),
            ..Self::default()
        }
    }

    /// Builder: add a property
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder: set the prototype consulted by property reads
    pub fn with_prototype(mut self, prototype: ObjectRef) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Builder: box a numeric primitive (numeric wrapper object)
    pub fn with_primitive(mut self, value: f64) -> Self {
        self.primitive = Some(value);
        self
    }

    /// Builder: attach an event-emission capability
    pub fn with_emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Set an own property, returning the previous value
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.write().insert(key.into(), value.into())
    }

    /// Remove an own property
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.properties.write().shift_remove(key)
    }

    /// Read an own property
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.properties.read().get(key).cloned()
    }

    /// Read a property, walking the prototype chain
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.get_own(key) {
            return Some(v);
        }
        let mut proto = self.prototype.clone();
        while let Some(p) = proto {
            if let Some(v) = p.get_own(key) {
                return Some(v);
            }
            proto = p.prototype.clone();
        }
        None
    }

    /// Check for an own property
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.read().contains_key(key)
    }

    /// Own property names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.properties.read().keys().cloned().collect()
    }

    /// Snapshot of own properties in insertion order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.properties
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of own properties
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    /// Check if the object has no own properties
    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }

    /// Class name for instances built by a class
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Prototype object
    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    /// Boxed numeric primitive
    pub fn primitive(&self) -> Option<f64> {
        self.primitive
    }

    /// Event-emission capability
    pub fn emitter(&self) -> Option<&Arc<EventEmitter>> {
        self.emitter.as_ref()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class_name", &self.class_name)
            .field("keys", &self.keys())
            .field("primitive", &self.primitive)
            .field("emitter", &self.emitter.is_some())
            .finish()
    }
}
