//! refbridge standard library
//!
//! Capabilities reachable from the root namespace: the console, the module
//! registry behind `require`, and the built-in modules it can load.

#![warn(missing_docs)]

pub mod console;
pub mod events;
pub mod registry;
pub mod timers;
pub mod util;

pub use console::{ConsoleBuffer, ConsoleLevel, ConsoleTarget};
pub use registry::{
    register_builtin, register_stdlib, ModuleFactory, ModuleRegistry, BUILTIN_MODULES,
};
