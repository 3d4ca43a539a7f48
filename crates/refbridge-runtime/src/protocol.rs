//! Wire protocol
//!
//! Line-delimited JSON. Inbound lines are requests
//! `{r, action, ffid, key, args}`; outbound lines are replies
//! `{r, key, val, ts}`, error replies `{r, error, message, ts}` and
//! notifications `{r, cb, val, ts}`.

use std::fmt;

use refbridge_sdk::{BridgeError, BridgeResult, Handle, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::classify::WireTag;

// ============================================================================
// Inbound
// ============================================================================

/// Dispatcher operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Read an attribute
    Get,
    /// Invoke an attribute as a function
    Call,
    /// Construct an instance from an attribute
    Init,
    /// Human-readable rendering
    Inspect,
    /// JSON encoding
    Serialize,
    /// Release a handle
    Free,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Get => "get",
            Action::Call => "call",
            Action::Init => "init",
            Action::Inspect => "inspect",
            Action::Serialize => "serialize",
            Action::Free => "free",
        };
        f.write_str(name)
    }
}

/// Attribute addressed by a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKey {
    /// Named property
    Name(String),
    /// Array index
    Index(u64),
}

impl AttributeKey {
    /// Property name used for lookup
    pub fn property(&self) -> String {
        match self {
            AttributeKey::Name(name) => name.clone(),
            AttributeKey::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKey::Name(name) => f.write_str(name),
            AttributeKey::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Request argument
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Literal JSON value
    Literal(Json),
    /// `{ffid: h}` reference marker
    Ref(Handle),
}

/// A decoded request
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Request id, echoed in the reply
    pub r: u64,
    /// Operation
    pub action: Action,
    /// Target handle
    pub ffid: Handle,
    /// Attribute, `None` for the target itself
    pub key: Option<AttributeKey>,
    /// Arguments in order
    pub args: Vec<Arg>,
}

/// Outcome of decoding one inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Well-formed request
    Request(Request),
    /// Request id present but the rest is malformed
    Invalid {
        /// Request id to reply to
        r: u64,
        /// What was wrong
        message: String,
    },
    /// Not a request at all; skipped without a reply
    Skip(String),
}

/// Decode one inbound line
pub fn decode_line(line: &str) -> Decoded {
    let json: Json = match serde_json::from_str(line) {
        Ok(json) => json,
        Err(e) => return Decoded::Skip(format!("not JSON: {}", e)),
    };
    let Some(r) = json.get("r").and_then(Json::as_u64) else {
        return Decoded::Skip("missing integer request id".to_string());
    };
    match decode_request(r, &json) {
        Ok(request) => Decoded::Request(request),
        Err(message) => Decoded::Invalid { r, message },
    }
}

fn decode_request(r: u64, json: &Json) -> Result<Request, String> {
    let action = match json.get("action") {
        Some(Json::String(name)) => serde_json::from_value::<Action>(Json::String(name.clone()))
            .map_err(|_| format!("unknown action '{}'", name))?,
        _ => return Err("missing action".to_string()),
    };
    let ffid = json
        .get("ffid")
        .and_then(Json::as_u64)
        .map(Handle)
        .ok_or_else(|| "missing or invalid ffid".to_string())?;
    let key = match json.get("key") {
        None | Some(Json::Null) => None,
        Some(Json::String(name)) => Some(AttributeKey::Name(name.clone())),
        Some(other) => Some(
            other
                .as_u64()
                .map(AttributeKey::Index)
                .ok_or_else(|| "key must be a string or a non-negative integer".to_string())?,
        ),
    };
    let args = match json.get("args") {
        None | Some(Json::Null) => Vec::new(),
        Some(Json::Array(items)) => items.iter().map(decode_arg).collect(),
        Some(_) => return Err("args must be an array".to_string()),
    };
    Ok(Request {
        r,
        action,
        ffid,
        key,
        args,
    })
}

fn decode_arg(json: &Json) -> Arg {
    match json.get("ffid").and_then(Json::as_u64) {
        Some(h) if json.is_object() => Arg::Ref(Handle(h)),
        _ => Arg::Literal(json.clone()),
    }
}

// ============================================================================
// Polling ids
// ============================================================================

/// Counterpart-chosen subscription key, echoed in notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PollingId {
    /// Integer id
    Int(i64),
    /// Text id
    Str(String),
}

impl PollingId {
    /// Read a polling id from a live argument
    pub fn from_value(value: &Value) -> BridgeResult<Self> {
        match value {
            Value::String(s) => Ok(PollingId::Str(s.clone())),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 => {
                Ok(PollingId::Int(*n as i64))
            }
            other => Err(BridgeError::Invocation(format!(
                "polling id must be an integer or a string, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for PollingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollingId::Int(i) => write!(f, "{}", i),
            PollingId::Str(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Outbound
// ============================================================================

/// Reply to a request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// Request id
    pub r: u64,
    /// Wire tag; absent for inspect, serialize and free
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<WireTag>,
    /// Payload
    pub val: Json,
}

/// Failed request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReply {
    /// Request id
    pub r: u64,
    /// Error kind
    pub error: String,
    /// Human-readable description
    pub message: String,
}

/// Event notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Milliseconds at firing
    pub r: i64,
    /// Subscription the event belongs to
    pub cb: PollingId,
    /// Handle of the argument bundle
    pub val: Handle,
}

/// Any outbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    /// Tagged or plain reply
    Reply(Reply),
    /// Error reply
    Error(ErrorReply),
    /// Uncorrelated notification
    Notification(Notification),
}

impl Outbound {
    /// Tagged reply
    pub fn reply(r: u64, tag: WireTag, val: Json) -> Self {
        Outbound::Reply(Reply {
            r,
            key: Some(tag),
            val,
        })
    }

    /// Untagged reply
    pub fn plain(r: u64, val: Json) -> Self {
        Outbound::Reply(Reply { r, key: None, val })
    }

    /// Error reply for `error`
    pub fn error(r: u64, error: &BridgeError) -> Self {
        Outbound::Error(ErrorReply {
            r,
            error: error.kind().to_string(),
            message: error.to_string(),
        })
    }

    /// Notification for an event that fired at `fired_at` (Unix ms)
    pub fn notification(fired_at: i64, cb: PollingId, val: Handle) -> Self {
        Outbound::Notification(Notification { r: fired_at, cb, val })
    }
}

#[derive(Serialize)]
struct Stamped<'a> {
    #[serde(flatten)]
    message: &'a Outbound,
    ts: i64,
}

/// Encode a message as one line (without the newline), stamping `ts`
pub fn encode(message: &Outbound) -> serde_json::Result<String> {
    serde_json::to_string(&Stamped {
        message,
        ts: now_millis(),
    })
}

/// Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
