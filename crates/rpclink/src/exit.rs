use std::fmt;
use std::io;

use rpclink_client::ClientError;
use rpclink_envelope::RemoteError;
use rpclink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { source, .. } | TransportError::Io(source) => {
            io_error(context, source)
        }
        TransportError::InvalidEndpoint { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::NoRuntime => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: &ClientError) -> CliError {
    let code = match err {
        ClientError::InvalidMethod => USAGE,
        ClientError::Remote { .. } => FAILURE,
        ClientError::MalformedEnvelope(_)
        | ClientError::MissingId
        | ClientError::UnhandledShape
        | ClientError::MalformedRemoteError { .. }
        | ClientError::Json(_) => DATA_INVALID,
        ClientError::Transport(_)
        | ClientError::QueueFull { .. }
        | ClientError::SendAbandoned { .. } => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// A server error reply. Unusable error objects count as invalid data.
pub fn remote_error(context: &str, err: &RemoteError) -> CliError {
    let code = if err.is_well_formed() {
        FAILURE
    } else {
        DATA_INVALID
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn lost_error(reason: Option<&str>) -> CliError {
    CliError::new(
        TRANSPORT_ERROR,
        format!("connection lost: {}", reason.unwrap_or("closed")),
    )
}
