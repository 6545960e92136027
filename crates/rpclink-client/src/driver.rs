//! Run a [`Client`] on tokio.
//!
//! The client itself never waits on anything. [`drive_until`] is the
//! loop that feeds it: transport events from the connector's channel,
//! and timer expiries at [`Client::poll_timeout`].

use std::time::Instant;

use rpclink_transport::{Connector, EventReceiver};
use tokio::time::sleep_until;
use tracing::debug;

use crate::client::{Client, ConnectionState};

/// Why [`drive_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The predicate held.
    Done,
    /// The client was closed.
    Closed,
    /// Every event sender is gone.
    Disconnected,
}

/// Feed `client` until `done` returns true, the client is closed, or the
/// event channel ends. `done` is checked before every wait.
pub async fn drive_until<C, F>(
    client: &mut Client<C>,
    events: &mut EventReceiver,
    mut done: F,
) -> DriveOutcome
where
    C: Connector,
    F: FnMut(&Client<C>) -> bool,
{
    loop {
        if done(client) {
            return DriveOutcome::Done;
        }
        if client.state() == ConnectionState::Closed {
            return DriveOutcome::Closed;
        }

        let deadline = client.poll_timeout();
        tokio::select! {
            event = events.recv() => match event {
                Some((generation, event)) => client.handle_transport_event(generation, event),
                None => {
                    debug!("transport event channel closed");
                    return DriveOutcome::Disconnected;
                }
            },
            _ = wait_for(deadline) => client.handle_timeout(),
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}
