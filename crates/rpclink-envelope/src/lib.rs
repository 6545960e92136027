//! JSON-RPC 2.0 envelope encoding and classification.
//!
//! Every message on an rpclink transport is one JSON object carrying
//! `"jsonrpc": "2.0"`. Exactly one of `method`, `result`, `error` or
//! `channel` decides its shape:
//! - `method` + `id` — request, `method` alone — notification
//! - `result` + `id` — successful reply
//! - `error` (+ `id`) — failed reply or server error
//! - `channel` + `payload` — push on a subscribed channel

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{decode, decode_value, encode, encode_request};
pub use envelope::{CorrelationId, Envelope, RemoteError, JSONRPC_VERSION};
pub use error::{EnvelopeError, Result};
