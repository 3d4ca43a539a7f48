//! Console capability
//!
//! The root namespace's `console` object. Each method formats its
//! arguments with [`crate::util::format`] and writes one line to the
//! configured target.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use refbridge_sdk::{Function, Object, Value};

/// Console method severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    /// `console.log`
    Log,
    /// `console.info`
    Info,
    /// `console.debug`
    Debug,
    /// `console.warn`
    Warn,
    /// `console.error`
    Error,
}

impl ConsoleLevel {
    /// Method name on the console object
    pub fn method(self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Debug => "debug",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        }
    }

    fn is_diagnostic(self) -> bool {
        matches!(self, ConsoleLevel::Warn | ConsoleLevel::Error)
    }

    const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Debug,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
    ];
}

/// Captured console lines
pub type ConsoleBuffer = Arc<Mutex<Vec<(ConsoleLevel, String)>>>;

/// Where console output goes
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    /// `log`/`info`/`debug` to stdout, `warn`/`error` to stderr
    #[default]
    Split,
    /// Everything to stderr
    Stderr,
    /// Captured in memory
    Buffer(ConsoleBuffer),
}

impl ConsoleTarget {
    /// Write one formatted line
    pub fn write_line(&self, level: ConsoleLevel, line: &str) {
        match self {
            ConsoleTarget::Split if !level.is_diagnostic() => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{}", line);
                let _ = out.flush();
            }
            ConsoleTarget::Split | ConsoleTarget::Stderr => {
                let _ = writeln!(std::io::stderr().lock(), "{}", line);
            }
            ConsoleTarget::Buffer(buffer) => buffer.lock().push((level, line.to_string())),
        }
    }
}

/// Build the console object writing to `target`
pub fn console_object(target: ConsoleTarget) -> Object {
    ConsoleLevel::ALL.into_iter().fold(Object::new(), |console, level| {
        let target = target.clone();
        console.with(
            level.method(),
            Function::native(level.method(), move |_this, args| {
                target.write_line(level, &crate::util::format(&args));
                Ok(Value::Undefined)
            }),
        )
    })
}
