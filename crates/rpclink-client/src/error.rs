use rpclink_envelope::{CorrelationId, EnvelopeError};
use rpclink_transport::TransportError;
use serde_json::Value;

/// Errors surfaced to observers through [`crate::ClientEvent::Error`].
///
/// None of these stop the client. They are reported and processing
/// continues with the next message or timer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// A call was issued without a method name.
    #[error("method is not specified")]
    InvalidMethod,

    /// An inbound message is not a JSON-RPC envelope.
    #[error("invalid JSON-RPC message: {0}")]
    MalformedEnvelope(String),

    /// A result arrived without a correlation id.
    #[error("message id is missing")]
    MissingId,

    /// An inbound envelope matches no shape the client handles.
    #[error("unhandled message")]
    UnhandledShape,

    /// The server reported an error.
    #[error("{message} (code {code})")]
    Remote {
        id: Option<CorrelationId>,
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The server reported an error without a usable code or message.
    #[error("wrong error format")]
    MalformedRemoteError { id: Option<CorrelationId> },

    /// The transport reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Inbound text is not valid JSON, or an envelope failed to serialize.
    #[error("json error: {0}")]
    Json(String),

    /// The outbound queue is at capacity; the envelope was dropped.
    #[error("send queue full ({capacity} envelopes)")]
    QueueFull { capacity: usize },

    /// An envelope was dropped after exhausting its retries. `id` is the
    /// call it carried; that call is no longer pending.
    #[error("send abandoned after {attempts} attempts")]
    SendAbandoned {
        id: Option<CorrelationId>,
        attempts: u32,
    },
}

impl From<EnvelopeError> for ClientError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::InvalidMethod => ClientError::InvalidMethod,
            EnvelopeError::MalformedEnvelope(reason) => ClientError::MalformedEnvelope(reason),
            EnvelopeError::MissingId => ClientError::MissingId,
            EnvelopeError::UnhandledShape => ClientError::UnhandledShape,
            EnvelopeError::Json(err) => ClientError::Json(err.to_string()),
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        ClientError::Transport(err.to_string())
    }
}
