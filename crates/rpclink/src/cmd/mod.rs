use std::time::Duration;

use clap::{Args, Subcommand};
use serde_json::Value;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod notify;
pub mod session;
pub mod subscribe;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Call a method and print its result.
    Call(CallArgs),
    /// Send a notification (no reply expected).
    Notify(NotifyArgs),
    /// Subscribe to a channel and print pushed payloads.
    Subscribe(SubscribeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, token: Option<String>) -> CliResult<i32> {
    match command {
        Command::Call(args) => call::run(args, format, token),
        Command::Notify(args) => notify::run(args, token),
        Command::Subscribe(args) => subscribe::run(args, format, token),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Server endpoint (host:port or tcp://host:port).
    pub endpoint: String,
    /// Method name.
    pub method: String,
    /// JSON params. Omitted from the request when not given.
    #[arg(long)]
    pub params: Option<String>,
    /// Maximum time to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Server endpoint (host:port or tcp://host:port).
    pub endpoint: String,
    /// Method name.
    pub method: String,
    /// JSON params. Omitted from the notification when not given.
    #[arg(long)]
    pub params: Option<String>,
    /// Maximum time to wait for the connection (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Server endpoint (host:port or tcp://host:port).
    pub endpoint: String,
    /// Channel name.
    pub channel: String,
    /// Exit after receiving N pushes.
    #[arg(long)]
    pub count: Option<usize>,
    /// Delay between reconnect attempts (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub reconnect_interval: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Single-threaded runtime: the client and its callbacks are not `Send`.
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

pub(crate) fn parse_params(params: Option<&str>) -> CliResult<Option<Value>> {
    params
        .map(|raw| {
            serde_json::from_str::<Value>(raw)
                .map_err(|err| CliError::new(USAGE, format!("--params is not valid JSON: {err}")))
        })
        .transpose()
}

pub(crate) fn require_method(method: &str) -> CliResult<()> {
    if method.trim().is_empty() {
        return Err(CliError::new(USAGE, "method must not be empty"));
    }
    Ok(())
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
