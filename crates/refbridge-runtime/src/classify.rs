//! Value classifier
//!
//! Decides how a result is represented on the wire. Precedence, first
//! match wins:
//! 1. bigint → `big`
//! 2. numeric-coercible → `num` (so a numeric wrapper object is `num`)
//! 3. array, object or promise → `obj`
//! 4. string → `string`
//! 5. function → `class` when it has a prototype and is not bound, else `fn`
//! 6. anything else → `void`

use refbridge_sdk::json::number_to_json;
use refbridge_sdk::Value;
use serde::Serialize;
use serde_json::Value as Json;

/// Discriminator on a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireTag {
    /// Text
    String,
    /// Arbitrary-precision integer, sent as a number
    Big,
    /// Number-like
    Num,
    /// Composite, sent as a handle
    Obj,
    /// Plain function, sent as a handle
    Fn,
    /// Constructor, sent as a handle
    Class,
    /// Nothing
    Void,
}

impl WireTag {
    /// Check if replies with this tag carry a handle
    pub fn is_reference(self) -> bool {
        matches!(self, WireTag::Obj | WireTag::Fn | WireTag::Class)
    }
}

/// Classify a value
pub fn classify(value: &Value) -> WireTag {
    if let Value::BigInt(_) = value {
        return WireTag::Big;
    }
    if !value.to_number().is_nan() {
        return WireTag::Num;
    }
    match value {
        Value::Array(_) | Value::Object(_) | Value::Promise(_) => WireTag::Obj,
        Value::String(_) => WireTag::String,
        Value::Function(f) if f.prototype().is_some() && !f.is_bound() => WireTag::Class,
        Value::Function(_) => WireTag::Fn,
        _ => WireTag::Void,
    }
}

/// Reply payload for a value whose tag does not carry a handle
pub fn scalar_json(value: &Value, tag: WireTag) -> Json {
    match (tag, value) {
        (WireTag::String, Value::String(s)) => Json::String(s.clone()),
        // Precision beyond 2^53 is lost
        (WireTag::Big, Value::BigInt(n)) => number_to_json(*n as f64),
        (WireTag::Num, Value::Null) => Json::Null,
        (WireTag::Num, Value::Bool(b)) => Json::Bool(*b),
        (WireTag::Num, other) => number_to_json(other.to_number()),
        _ => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::num::f64 as float;
    use proptest::prelude::*;
    use refbridge_sdk::{ClassBuilder, Function, Object, Promise};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_primitives() {
        assert_eq!(classify(&Value::from("hi")), WireTag::String);
        assert_eq!(classify(&Value::from(42)), WireTag::Num);
        assert_eq!(classify(&Value::Bool(false)), WireTag::Num);
        assert_eq!(classify(&Value::Null), WireTag::Num);
        assert_eq!(classify(&Value::Undefined), WireTag::Void);
        assert_eq!(classify(&Value::Number(f64::NAN)), WireTag::Void);
        assert_eq!(classify(&Value::BigInt(1 << 70)), WireTag::Big);
    }

    #[test]
    fn test_numeric_coercion_wins_over_shape() {
        assert_eq!(classify(&Value::from("42")), WireTag::Num);
        let wrapper = Value::object(Object::with_class("Number").with_primitive(5.0));
        assert_eq!(classify(&wrapper), WireTag::Num);
        assert_eq!(scalar_json(&wrapper, WireTag::Num), json!(5));
        assert_eq!(scalar_json(&Value::from(" 7 "), WireTag::Num), json!(7));
    }

    #[test]
    fn test_composites() {
        assert_eq!(classify(&Value::object(Object::new().with("a", 1))), WireTag::Obj);
        let pair = Value::array(vec![Value::from(1), Value::from(2)]);
        assert_eq!(classify(&pair), WireTag::Obj);
        assert_eq!(classify(&Value::Promise(Promise::resolved(Value::Null))), WireTag::Obj);
    }

    #[test]
    fn test_blank_text_and_short_arrays_are_num() {
        assert_eq!(classify(&Value::from("")), WireTag::Num);
        assert_eq!(scalar_json(&Value::from(""), WireTag::Num), json!(0));
        assert_eq!(classify(&Value::from("  ")), WireTag::Num);

        let empty = Value::array(vec![]);
        assert_eq!(classify(&empty), WireTag::Num);
        assert_eq!(scalar_json(&empty, WireTag::Num), json!(0));

        let single = Value::array(vec![Value::from(7)]);
        assert_eq!(classify(&single), WireTag::Num);
        assert_eq!(scalar_json(&single, WireTag::Num), json!(7));

        let text = Value::array(vec![Value::from("3")]);
        assert_eq!(scalar_json(&text, WireTag::Num), json!(3));

        let words = Value::array(vec![Value::from("zero")]);
        assert_eq!(classify(&words), WireTag::Obj);
    }

    #[test]
    fn test_signed_radix_digits_are_text() {
        assert_eq!(classify(&Value::from("0x+5")), WireTag::String);
        assert_eq!(classify(&Value::from("0x1f")), WireTag::Num);
    }

    #[test]
    fn test_functions_and_classes() {
        let f = Function::native("f", |_, _| Ok(Value::Undefined));
        assert_eq!(classify(&Value::function(f)), WireTag::Fn);

        let class = ClassBuilder::new("Point").build();
        assert_eq!(classify(&Value::function(class)), WireTag::Class);

        let with_proto = Arc::new(
            Function::native("g", |_, _| Ok(Value::Undefined))
                .with_prototype(Arc::new(Object::new())),
        );
        assert_eq!(classify(&Value::Function(Arc::clone(&with_proto))), WireTag::Class);
        let bound = with_proto.bind(Value::Undefined, vec![]);
        assert_eq!(classify(&Value::function(bound)), WireTag::Fn);
    }

    #[test]
    fn test_scalar_payloads() {
        assert_eq!(scalar_json(&Value::from("hi"), WireTag::String), json!("hi"));
        assert_eq!(scalar_json(&Value::from(42), WireTag::Num), json!(42));
        assert_eq!(scalar_json(&Value::Number(2.5), WireTag::Num), json!(2.5));
        assert_eq!(scalar_json(&Value::Bool(true), WireTag::Num), json!(true));
        assert_eq!(scalar_json(&Value::Null, WireTag::Num), json!(null));
        assert_eq!(scalar_json(&Value::BigInt(12), WireTag::Big), json!(12));
        assert_eq!(scalar_json(&Value::Undefined, WireTag::Void), json!(null));
    }

    #[test]
    fn test_reference_tags() {
        assert!(WireTag::Obj.is_reference());
        assert!(WireTag::Class.is_reference());
        assert!(!WireTag::Num.is_reference());
        assert_eq!(serde_json::to_value(WireTag::Class).unwrap(), json!("class"));
    }

    proptest! {
        #[test]
        fn test_non_nan_numbers_are_num(
            n in float::NORMAL | float::ZERO | float::INFINITE
        ) {
            prop_assert_eq!(classify(&Value::Number(n)), WireTag::Num);
        }

        #[test]
        fn test_integer_text_is_num(n in any::<i32>()) {
            let text = Value::from(n.to_string());
            prop_assert_eq!(classify(&text), WireTag::Num);
            prop_assert_eq!(scalar_json(&text, WireTag::Num), json!(n));
        }

        #[test]
        fn test_bigint_precedes_everything(n in any::<i64>()) {
            prop_assert_eq!(classify(&Value::BigInt(n as i128)), WireTag::Big);
        }

        #[test]
        fn test_word_text_is_string(s in "x[a-zA-Z ]*") {
            prop_assert_eq!(classify(&Value::from(s)), WireTag::String);
        }
    }
}
