//! Error types reported by bridge operations

use crate::Handle;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failure of a bridge operation.
///
/// Each variant maps to one wire error kind (see [`BridgeError::kind`]).
/// Native functions raise these directly; anything else they raise is an
/// [`BridgeError::Invocation`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Handle absent or already freed
    #[error("Reference {0} not found")]
    ReferenceNotFound(Handle),

    /// Attribute missing on the target
    #[error("Attribute '{attribute}' not found")]
    AttributeNotFound {
        /// Attribute that was looked up
        attribute: String,
    },

    /// Call or construction target is not invocable
    #[error("'{attribute}' is not callable")]
    NotCallable {
        /// Attribute (or function name) that was invoked
        attribute: String,
    },

    /// Target raised during execution
    #[error("{0}")]
    Invocation(String),

    /// Value cannot be encoded as JSON
    #[error("{0}")]
    Serialization(String),

    /// Malformed request shape
    #[error("{0}")]
    Protocol(String),
}

impl BridgeError {
    /// Wire name of this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::ReferenceNotFound(_) => "ReferenceNotFound",
            BridgeError::AttributeNotFound { .. } => "AttributeNotFound",
            BridgeError::NotCallable { .. } => "NotCallable",
            BridgeError::Invocation(_) => "InvocationError",
            BridgeError::Serialization(_) => "SerializationError",
            BridgeError::Protocol(_) => "ProtocolError",
        }
    }

    /// Build an attribute-not-found error
    pub fn attribute_not_found(attribute: impl Into<String>) -> Self {
        BridgeError::AttributeNotFound {
            attribute: attribute.into(),
        }
    }

    /// Build a not-callable error
    pub fn not_callable(attribute: impl Into<String>) -> Self {
        BridgeError::NotCallable {
            attribute: attribute.into(),
        }
    }
}

impl From<String> for BridgeError {
    fn from(s: String) -> Self {
        BridgeError::Invocation(s)
    }
}

impl From<&str> for BridgeError {
    fn from(s: &str) -> Self {
        BridgeError::Invocation(s.to_string())
    }
}
