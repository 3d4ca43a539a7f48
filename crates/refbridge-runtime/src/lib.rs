//! refbridge runtime
//!
//! Serves live values to a counterpart process over a line-delimited JSON
//! channel. The counterpart addresses values through integer handles held
//! in a per-session reference table; each request reads an attribute,
//! calls, constructs, renders, serializes or releases the value behind a
//! handle.

#![warn(missing_docs)]

pub mod classify;
pub mod config;
mod dispatch;
pub mod error;
pub mod polling;
pub mod protocol;
pub mod session;
pub mod table;
pub mod transport;

pub use classify::{classify, WireTag};
pub use config::{BridgeConfig, ReplyStream};
pub use error::ServeError;
pub use protocol::{decode_line, Decoded, Outbound, PollingId, Request};
pub use session::Session;
pub use table::ReferenceTable;
pub use transport::serve;
