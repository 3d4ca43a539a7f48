//! `util` module: `inspect` and `format`

use refbridge_sdk::args::arg;
use refbridge_sdk::inspect::{format_number, inspect};
use refbridge_sdk::json::stringify;
use refbridge_sdk::{Function, Object, Value};

/// Build the `util` module object
pub fn module() -> Value {
    Value::object(
        Object::new()
            .with(
                "inspect",
                Function::native("inspect", |_this, args| {
                    Ok(Value::String(inspect(&arg(&args, 0))))
                }),
            )
            .with(
                "format",
                Function::native("format", |_this, args| Ok(Value::String(format(&args)))),
            ),
    )
}

/// Format arguments into one line.
///
/// When the first argument is a string it is a template: `%s`, `%d`, `%i`,
/// `%f`, `%j`, `%o`, `%O` consume the following arguments and `%%` is a
/// literal percent sign. Arguments left over are appended separated by a
/// space; strings print verbatim, everything else through `inspect`.
pub fn format(args: &[Value]) -> String {
    let mut pieces = Vec::with_capacity(args.len());
    let mut rest = args.iter();
    if let Some(Value::String(template)) = args.first() {
        rest.next();
        pieces.push(expand(template, &mut rest));
    }
    pieces.extend(rest.map(plain));
    pieces.join(" ")
}

fn expand(template: &str, rest: &mut std::slice::Iter<'_, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O')) => match rest.next() {
                Some(value) => {
                    chars.next();
                    out.push_str(&substitute(spec, value));
                }
                None => out.push('%'),
            },
            _ => out.push('%'),
        }
    }
    out
}

fn substitute(spec: char, value: &Value) -> String {
    match spec {
        's' => plain(value),
        'd' => match value {
            Value::BigInt(n) => format!("{}n", n),
            other => format_number(other.to_number()),
        },
        'i' => match value {
            Value::BigInt(n) => format!("{}n", n),
            other => format_number(other.to_number().trunc()),
        },
        'f' => format_number(value.to_number()),
        'j' => match stringify(value) {
            Ok(Some(text)) => text,
            Ok(None) => "undefined".to_string(),
            Err(_) => "[Circular]".to_string(),
        },
        _ => inspect(value),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => inspect(other),
    }
}
