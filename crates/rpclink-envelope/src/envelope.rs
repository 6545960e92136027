use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol-version marker carried by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Opaque token linking a request to its response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The `error` member of an error response.
///
/// Kept as decoded: servers are not trusted to send both `code` and
/// `message`, so either may be missing. See [`RemoteError::is_well_formed`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteError {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<Value>,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
            data: None,
        }
    }

    /// A usable error carries a non-zero code and a non-empty message.
    pub fn is_well_formed(&self) -> bool {
        matches!(self.code, Some(code) if code != 0)
            && matches!(self.message.as_deref(), Some(message) if !message.is_empty())
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{message} (code {code})"),
            (None, Some(message)) => f.write_str(message),
            (Some(code), None) => write!(f, "code {code}"),
            (None, None) => f.write_str("wrong error format"),
        }
    }
}

/// One JSON-RPC message, classified by shape.
///
/// `params: None` means the field is absent; `Some(Value::Null)` is an
/// explicit `"params": null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A call expecting a correlated reply.
    Request {
        id: CorrelationId,
        method: String,
        params: Option<Value>,
        token: Option<String>,
    },
    /// A call without a reply.
    Notification {
        method: String,
        params: Option<Value>,
        token: Option<String>,
    },
    /// Successful reply to a request.
    Success { id: CorrelationId, result: Value },
    /// Failed reply, or a server error not tied to any request.
    Error {
        id: Option<CorrelationId>,
        error: RemoteError,
    },
    /// Unsolicited payload on a named channel.
    Push { channel: String, payload: Value },
}

impl Envelope {
    /// Correlation id carried by this envelope, if any.
    pub fn id(&self) -> Option<&CorrelationId> {
        match self {
            Envelope::Request { id, .. } | Envelope::Success { id, .. } => Some(id),
            Envelope::Error { id, .. } => id.as_ref(),
            Envelope::Notification { .. } | Envelope::Push { .. } => None,
        }
    }

    /// Short name of the shape, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Request { .. } => "request",
            Envelope::Notification { .. } => "notification",
            Envelope::Success { .. } => "result",
            Envelope::Error { .. } => "error",
            Envelope::Push { .. } => "push",
        }
    }
}
