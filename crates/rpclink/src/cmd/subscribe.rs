use std::cell::Cell;
use std::rc::Rc;

use rpclink_client::ClientConfig;
use tracing::info;

use crate::cmd::session::{Session, TcpClient};
use crate::cmd::{parse_duration, runtime, SubscribeArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_push, OutputFormat};

pub fn run(args: SubscribeArgs, format: OutputFormat, token: Option<String>) -> CliResult<i32> {
    let reconnect_interval = parse_duration(&args.reconnect_interval)?;
    let mut config = ClientConfig::default()
        .with_reconnect_interval(reconnect_interval)
        .with_resubscribe_on_reconnect(true);
    config.token = token;

    runtime()?.block_on(async move {
        let mut session = Session::connect(&args.endpoint, config)?;
        let log = session.log();

        let received = Rc::new(Cell::new(0usize));
        let counter = received.clone();
        let channel = args.channel.clone();
        session.client.subscribe(&args.channel, move |payload| {
            print_push(&channel, &payload, format);
            counter.set(counter.get().saturating_add(1));
        });

        let target = args.count;
        tokio::select! {
            outcome = session.drive(None, |client| {
                rejected(client) || matches!(target, Some(count) if received.get() >= count)
            }) => {
                outcome?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!(received = received.get(), "interrupted");
            }
        }

        if rejected(&session.client) {
            let err = match log.first_fatal_error() {
                Some(err) => client_error("subscribe failed", &err),
                None => CliError::new(
                    FAILURE,
                    format!("subscribe failed: {} was not acknowledged", args.channel),
                ),
            };
            session.shutdown().await;
            return Err(err);
        }

        session.shutdown().await;
        Ok(SUCCESS)
    })
}

/// The subscribe request was answered without a listener being installed.
fn rejected(client: &TcpClient) -> bool {
    client.pending_calls() == 0 && client.subscribed_channels().is_empty()
}
