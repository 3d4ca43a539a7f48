//! Human-readable rendering of live values
//!
//! Produces the single-line debugging form used by `inspect` requests and
//! by the console: strings are quoted, records print as `{ key: value }`,
//! nesting deeper than the depth limit collapses to `[Object]`, and
//! circular structures are marked with `<ref *n>` / `[Circular *n]`.

use std::collections::HashMap;

use crate::value::Value;

/// Default nesting depth rendered before collapsing
pub const DEFAULT_DEPTH: usize = 2;

/// Render a value with the default depth limit
pub fn inspect(value: &Value) -> String {
    inspect_with_depth(value, DEFAULT_DEPTH)
}

/// Render a value, collapsing composites nested deeper than `depth`
pub fn inspect_with_depth(value: &Value, depth: usize) -> String {
    let mut scan = CycleScan::default();
    scan.walk(value, 0, depth);

    let mut renderer = Renderer {
        max_depth: depth,
        refs: scan.refs,
        stack: Vec::new(),
    };
    let mut out = String::new();
    renderer.render(value, 0, &mut out);
    out
}

/// Format a double the way the console prints numbers
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }
    // Exponent form: 1e21 -> "1e+21"
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// Quote a string, preferring single quotes
pub fn quote(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

// ============================================================================
// Cycle detection
// ============================================================================

#[derive(Default)]
struct CycleScan {
    stack: Vec<usize>,
    refs: HashMap<usize, usize>,
}

impl CycleScan {
    fn walk(&mut self, value: &Value, depth: usize, max_depth: usize) {
        let Some(id) = value.identity() else {
            return;
        };
        if self.stack.contains(&id) {
            let next = self.refs.len() + 1;
            self.refs.entry(id).or_insert(next);
            return;
        }
        if depth > max_depth {
            return;
        }
        self.stack.push(id);
        for child in children(value) {
            self.walk(&child, depth + 1, max_depth);
        }
        self.stack.pop();
    }
}

fn children(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.read().clone(),
        Value::Object(obj) => obj.entries().into_iter().map(|(_, v)| v).collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// Rendering
// ============================================================================

struct Renderer {
    max_depth: usize,
    refs: HashMap<usize, usize>,
    stack: Vec<usize>,
}

impl Renderer {
    fn render(&mut self, value: &Value, depth: usize, out: &mut String) {
        match value {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::BigInt(n) => {
                out.push_str(&n.to_string());
                out.push('n');
            }
            Value::String(s) => out.push_str(&quote(s)),
            Value::Function(f) => {
                if f.prototype().is_some() && !f.is_bound() {
                    out.push_str(&format!("[class {}]", f.name()));
                } else if f.name().is_empty() {
                    out.push_str("[Function (anonymous)]");
                } else {
                    out.push_str(&format!("[Function: {}]", f.name()));
                }
            }
            Value::Promise(p) => match p.peek() {
                None => out.push_str("Promise { <pending> }"),
                Some(Ok(v)) => {
                    out.push_str("Promise { ");
                    self.render(v, depth + 1, out);
                    out.push_str(" }");
                }
                Some(Err(e)) => out.push_str(&format!("Promise {{ <rejected> {} }}", e)),
            },
            Value::Array(_) | Value::Object(_) => self.render_composite(value, depth, out),
        }
    }

    fn render_composite(&mut self, value: &Value, depth: usize, out: &mut String) {
        if let Some(obj) = value.as_object() {
            if let Some(n) = obj.primitive() {
                out.push_str(&format!("[Number: {}]", format_number(n)));
                return;
            }
        }

        let id = value.identity().unwrap_or_default();
        if self.stack.contains(&id) {
            let n = self.refs.get(&id).copied().unwrap_or(0);
            out.push_str(&format!("[Circular *{}]", n));
            return;
        }
        if depth > self.max_depth {
            out.push_str(&match value {
                Value::Array(_) => "[Array]".to_string(),
                Value::Object(obj) => format!("[{}]", obj.class_name().unwrap_or("Object")),
                _ => String::new(),
            });
            return;
        }
        if let Some(n) = self.refs.get(&id) {
            out.push_str(&format!("<ref *{}> ", n));
        }

        self.stack.push(id);
        match value {
            Value::Array(items) => {
                let items = items.read().clone();
                if items.is_empty() {
                    out.push_str("[]");
                } else {
                    out.push_str("[ ");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.render(item, depth + 1, out);
                    }
                    out.push_str(" ]");
                }
            }
            Value::Object(obj) => {
                if let Some(name) = obj.class_name() {
                    out.push_str(name);
                    out.push(' ');
                }
                let entries = obj.entries();
                if entries.is_empty() {
                    out.push_str("{}");
                } else {
                    out.push_str("{ ");
                    for (i, (key, member)) in entries.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&format_key(key));
                        out.push_str(": ");
                        self.render(member, depth + 1, out);
                    }
                    out.push_str(" }");
                }
            }
            _ => {}
        }
        self.stack.pop();
    }
}

fn format_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}
