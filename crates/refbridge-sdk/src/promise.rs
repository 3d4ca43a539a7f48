//! Pending asynchronous results
//!
//! A `Promise` wraps a shared future, so any number of holders can await
//! the same settlement.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::error::BridgeError;
use crate::value::Value;

/// A shareable pending result.
#[derive(Clone)]
pub struct Promise(Shared<BoxFuture<'static, Result<Value, BridgeError>>>);

impl Promise {
    /// Wrap a future
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, BridgeError>> + Send + 'static,
    {
        Promise(future.boxed().shared())
    }

    /// Create an already-fulfilled promise
    pub fn resolved(value: Value) -> Self {
        Self::new(async move { Ok(value) })
    }

    /// Create an already-rejected promise
    pub fn rejected(error: BridgeError) -> Self {
        Self::new(async move { Err(error) })
    }

    /// Settlement, if the promise has already been driven to completion
    pub fn peek(&self) -> Option<&Result<Value, BridgeError>> {
        self.0.peek()
    }

    /// Await settlement
    pub async fn settle(&self) -> Result<Value, BridgeError> {
        self.0.clone().await
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek() {
            None => f.write_str("Promise(<pending>)"),
            Some(Ok(v)) => write!(f, "Promise({:?})", v),
            Some(Err(e)) => write!(f, "Promise(<rejected> {})", e),
        }
    }
}
