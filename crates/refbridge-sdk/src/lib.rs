//! refbridge SDK - live values addressed through handles
//!
//! This crate provides the value model that a bridge session owns on behalf
//! of its counterpart: primitives, shared objects and arrays, native
//! functions and classes, pending results and event emitters. It also holds
//! the error type every bridge operation reports, plus the JSON and
//! inspection renderings of a value.
//!
//! # Example
//!
//! ```ignore
//! use refbridge_sdk::{ClassBuilder, Object, Value};
//!
//! let point = ClassBuilder::new("Point")
//!     .initializer(|this, args| {
//!         this.insert("x", args.first().cloned().unwrap_or_default());
//!         Ok(())
//!     })
//!     .build();
//!
//! let module = Object::new().with("Point", point);
//! ```

#![warn(missing_docs)]

pub mod args;
pub mod class;
pub mod emitter;
pub mod error;
pub mod function;
pub mod inspect;
pub mod json;
pub mod promise;
pub mod value;

pub use class::ClassBuilder;
pub use emitter::{EventEmitter, Listener, ListenerId};
pub use error::{BridgeError, BridgeResult};
pub use function::{Function, NativeFn};
pub use promise::Promise;
pub use value::{ArrayRef, FunctionRef, Object, ObjectRef, Value};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Handle
// ============================================================================

/// Integer reference by which the counterpart addresses a live value.
///
/// Handle 0 is the root namespace and is never released.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Handle(pub u64);

impl Handle {
    /// The permanent root namespace handle
    pub const ROOT: Handle = Handle(0);

    /// Check if this is the root handle
    #[inline]
    pub const fn is_root(self) -> bool {
        self.0 == 0
    }

    /// Get the raw handle number
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Handle(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_root() {
        assert!(Handle::ROOT.is_root());
        assert!(!Handle(7).is_root());
        assert_eq!(Handle::from(7).get(), 7);
    }

    #[test]
    fn test_handle_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Handle(12)).unwrap(), "12");
        let h: Handle = serde_json::from_str("3").unwrap();
        assert_eq!(h, Handle(3));
    }
}
