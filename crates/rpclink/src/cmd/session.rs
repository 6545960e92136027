use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rpclink_client::{drive_until, Client, ClientConfig, ClientError, ClientEvent, DriveOutcome};
use rpclink_transport::{parse_endpoint, EventReceiver, TcpLineConnector, TransportEvent};
use tracing::debug;

use crate::exit::{transport_error, CliError, CliResult, TIMEOUT};

/// How long to wait for the transport to confirm a close before exiting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub type TcpClient = Client<TcpLineConnector>;

/// A client on a TCP line transport plus a log of every event it emitted.
pub struct Session {
    pub client: TcpClient,
    events: EventReceiver,
    log: Rc<RefCell<Vec<ClientEvent>>>,
}

impl Session {
    /// Validate `endpoint` and start connecting. Must run inside a runtime.
    pub fn connect(endpoint: &str, config: ClientConfig) -> CliResult<Self> {
        let endpoint =
            parse_endpoint(endpoint).map_err(|err| transport_error("invalid endpoint", err))?;
        let (connector, events) = TcpLineConnector::new();
        let mut client = Client::connect_with_config(endpoint, connector, config);

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        client.on_event(move |event| sink.borrow_mut().push(event.clone()));

        Ok(Self {
            client,
            events,
            log,
        })
    }

    /// Shared view of the event log, for use inside drive predicates.
    pub fn log(&self) -> EventLog {
        EventLog(self.log.clone())
    }

    /// Drive the client until `done` holds, optionally bounded by `limit`.
    pub async fn drive<F>(&mut self, limit: Option<Duration>, done: F) -> CliResult<DriveOutcome>
    where
        F: FnMut(&TcpClient) -> bool,
    {
        let drive = drive_until(&mut self.client, &mut self.events, done);
        match limit {
            Some(limit) => tokio::time::timeout(limit, drive)
                .await
                .map_err(|_| CliError::new(TIMEOUT, format!("timed out after {limit:?}"))),
            None => Ok(drive.await),
        }
    }

    /// Close the client and give the transport a moment to flush.
    pub async fn shutdown(mut self) {
        let generation = self.client.generation();
        self.client.close();

        let confirm = async {
            while let Some((from, event)) = self.events.recv().await {
                if from == generation && matches!(event, TransportEvent::Closed { .. }) {
                    break;
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, confirm).await.is_err() {
            debug!("transport did not confirm close");
        }
    }
}

#[derive(Clone)]
pub struct EventLog(Rc<RefCell<Vec<ClientEvent>>>);

impl EventLog {
    /// Reason of the first connection loss, if one happened.
    pub fn first_loss(&self) -> Option<Option<String>> {
        self.0.borrow().iter().find_map(|event| match event {
            ClientEvent::Lost { reason } => Some(reason.clone()),
            _ => None,
        })
    }

    /// First reported error other than transport noise, which shows up as a loss.
    pub fn first_fatal_error(&self) -> Option<ClientError> {
        self.0.borrow().iter().find_map(|event| match event {
            ClientEvent::Error(ClientError::Transport(_)) => None,
            ClientEvent::Error(err) => Some(err.clone()),
            _ => None,
        })
    }
}
