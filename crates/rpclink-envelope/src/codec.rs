use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::envelope::{CorrelationId, Envelope, RemoteError, JSONRPC_VERSION};
use crate::error::{EnvelopeError, Result};

#[derive(Serialize)]
struct OutgoingCall<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a CorrelationId>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
}

/// Encode an outgoing request (with `id`) or notification (without).
///
/// Wire format:
/// ```text
/// {"jsonrpc":"2.0","id":"…","method":"…","params":…,"token":"…"}
/// ```
/// `params` and `token` are omitted when `None`; `Some(Value::Null)`
/// params are written as an explicit `null`.
pub fn encode_request(
    method: &str,
    params: Option<&Value>,
    id: Option<&CorrelationId>,
    token: Option<&str>,
) -> Result<String> {
    if method.is_empty() {
        return Err(EnvelopeError::InvalidMethod);
    }

    let call = OutgoingCall {
        jsonrpc: JSONRPC_VERSION,
        id,
        method,
        params,
        token,
    };
    Ok(serde_json::to_string(&call)?)
}

/// Encode any envelope shape. Used for replies and pushes in test servers.
pub fn encode(envelope: &Envelope) -> Result<String> {
    let mut map = Map::new();
    map.insert("jsonrpc".into(), Value::from(JSONRPC_VERSION));

    match envelope {
        Envelope::Request {
            id,
            method,
            params,
            token,
        } => return encode_request(method, params.as_ref(), Some(id), token.as_deref()),
        Envelope::Notification {
            method,
            params,
            token,
        } => return encode_request(method, params.as_ref(), None, token.as_deref()),
        Envelope::Success { id, result } => {
            map.insert("id".into(), Value::from(id.as_str()));
            map.insert("result".into(), result.clone());
        }
        Envelope::Error { id, error } => {
            if let Some(id) = id {
                map.insert("id".into(), Value::from(id.as_str()));
            }
            let mut body = Map::new();
            if let Some(code) = error.code {
                body.insert("code".into(), Value::from(code));
            }
            if let Some(message) = &error.message {
                body.insert("message".into(), Value::from(message.as_str()));
            }
            if let Some(data) = &error.data {
                body.insert("data".into(), data.clone());
            }
            map.insert("error".into(), Value::Object(body));
        }
        Envelope::Push { channel, payload } => {
            map.insert("channel".into(), Value::from(channel.as_str()));
            map.insert("payload".into(), payload.clone());
        }
    }

    Ok(serde_json::to_string(&Value::Object(map))?)
}

/// Parse and classify one inbound message.
///
/// Classification order: `error`, then `result` (requires `id`), then
/// `channel`, then `method`. Anything else is
/// [`EnvelopeError::UnhandledShape`].
pub fn decode(raw: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(raw)?;
    let envelope = decode_value(value)?;
    trace!(kind = envelope.kind(), id = ?envelope.id(), "decoded envelope");
    Ok(envelope)
}

/// Classify an already-parsed JSON value. See [`decode`].
pub fn decode_value(value: Value) -> Result<Envelope> {
    let Value::Object(mut map) = value else {
        return Err(EnvelopeError::MalformedEnvelope(
            "message is not a JSON object".to_string(),
        ));
    };

    if !map.contains_key("jsonrpc") {
        return Err(EnvelopeError::MalformedEnvelope(
            "missing jsonrpc version marker".to_string(),
        ));
    }

    let id = take_id(&mut map);

    if let Some(error) = map.remove("error") {
        return Ok(Envelope::Error {
            id,
            error: remote_error(error),
        });
    }

    if let Some(result) = map.remove("result") {
        let id = id.ok_or(EnvelopeError::MissingId)?;
        return Ok(Envelope::Success { id, result });
    }

    if let Some(channel) = map.remove("channel") {
        let Value::String(channel) = channel else {
            return Err(EnvelopeError::MalformedEnvelope(
                "channel must be a string".to_string(),
            ));
        };
        let payload = map.remove("payload").unwrap_or(Value::Null);
        return Ok(Envelope::Push { channel, payload });
    }

    if let Some(method) = map.remove("method") {
        let Value::String(method) = method else {
            return Err(EnvelopeError::MalformedEnvelope(
                "method must be a string".to_string(),
            ));
        };
        let params = map.remove("params");
        let token = match map.remove("token") {
            Some(Value::String(token)) => Some(token),
            _ => None,
        };
        return Ok(match id {
            Some(id) => Envelope::Request {
                id,
                method,
                params,
                token,
            },
            None => Envelope::Notification {
                method,
                params,
                token,
            },
        });
    }

    Err(EnvelopeError::UnhandledShape)
}

/// String ids are taken verbatim, numeric ids by their decimal text.
fn take_id(map: &mut Map<String, Value>) -> Option<CorrelationId> {
    match map.remove("id")? {
        Value::String(id) => Some(CorrelationId::from(id)),
        Value::Number(id) => Some(CorrelationId::from(id.to_string())),
        _ => None,
    }
}

fn remote_error(value: Value) -> RemoteError {
    let mut body = match value {
        Value::Object(body) => body,
        other => {
            return RemoteError {
                code: None,
                message: None,
                data: Some(other),
            }
        }
    };

    RemoteError {
        code: body.get("code").and_then(Value::as_i64),
        message: body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        data: body.remove("data"),
    }
}
