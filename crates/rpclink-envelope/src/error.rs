/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// An outgoing envelope was built without a method name.
    #[error("method is not specified")]
    InvalidMethod,

    /// The message is not a JSON-RPC object (missing version marker, wrong field types).
    #[error("invalid JSON-RPC message: {0}")]
    MalformedEnvelope(String),

    /// A result arrived without a correlation id.
    #[error("message id is missing")]
    MissingId,

    /// The object matches none of the known envelope shapes.
    #[error("unhandled message")]
    UnhandledShape,

    /// The text is not valid JSON, or an envelope could not be serialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
