use std::fmt;
use std::time::Instant;

use rpclink_envelope::{decode, encode_request, CorrelationId, Envelope, RemoteError};
use rpclink_transport::{Connector, Generation, Transport, TransportEvent};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock, Timer};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{ClientEvent, ObserverId, Observers};
use crate::id::IdGenerator;
use crate::pending::{CallResult, Completion, PendingCalls};
use crate::scheduler::{Delivery, SendScheduler};
use crate::subscriptions::Subscriptions;

/// Method used to subscribe to a channel. The channel name is the params.
pub const SUBSCRIBE_METHOD: &str = "subscribe";
/// Method used to unsubscribe from a channel. The channel name is the params.
pub const UNSUBSCRIBE_METHOD: &str = "unsubscribe";

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A transport was requested and has not reported open yet.
    Connecting,
    /// The transport is ready.
    Open,
    /// The transport went away; the reconnect timer is running.
    LostReconnecting,
    /// Closed by the caller. Terminal.
    Closed,
}

/// JSON-RPC 2.0 client over one auto-reconnecting transport.
///
/// The client never does IO on its own. The host feeds it transport
/// events through [`Client::handle_transport_event`] and wakes it at
/// [`Client::poll_timeout`] by calling [`Client::handle_timeout`].
/// Callers learn about lifecycle changes and errors through observers
/// registered with [`Client::on_event`].
pub struct Client<C: Connector> {
    endpoint: String,
    config: ClientConfig,
    connector: C,
    transport: Option<C::Transport>,
    generation: Generation,
    state: ConnectionState,
    opened_once: bool,
    reconnect_timer: Timer,
    ids: IdGenerator,
    pending: PendingCalls,
    subscriptions: Subscriptions,
    outbound: SendScheduler,
    observers: Observers,
    clock: Box<dyn Clock>,
}

impl<C: Connector> Client<C> {
    /// Create a client with default configuration and start connecting.
    pub fn connect(endpoint: impl Into<String>, connector: C) -> Self {
        Self::connect_with_config(endpoint, connector, ClientConfig::default())
    }

    /// Create a client with explicit configuration and start connecting.
    pub fn connect_with_config(
        endpoint: impl Into<String>,
        connector: C,
        config: ClientConfig,
    ) -> Self {
        Self::connect_with(endpoint, connector, config, SystemClock)
    }

    /// Create a client reading time from `clock` and start connecting.
    pub fn connect_with(
        endpoint: impl Into<String>,
        connector: C,
        config: ClientConfig,
        clock: impl Clock + 'static,
    ) -> Self {
        let outbound = SendScheduler::new(
            config.send_retry_interval,
            config.max_queued,
            config.max_send_attempts,
        );
        let mut client = Self {
            endpoint: endpoint.into(),
            config,
            connector,
            transport: None,
            generation: Generation::default(),
            state: ConnectionState::Connecting,
            opened_once: false,
            reconnect_timer: Timer::default(),
            ids: IdGenerator::new(),
            pending: PendingCalls::new(),
            subscriptions: Subscriptions::new(),
            outbound,
            observers: Observers::new(),
            clock: Box::new(clock),
        };
        client.open();
        client
    }

    /// Replace the transport with a fresh one.
    ///
    /// Any current transport is closed first; its late events are ignored.
    /// Refused once the client has been closed.
    pub fn open(&mut self) {
        if self.state == ConnectionState::Closed {
            warn!(endpoint = %self.endpoint, "open() after close() ignored");
            return;
        }

        self.generation = self.generation.next();
        if let Some(mut superseded) = self.transport.take() {
            if let Err(err) = superseded.close() {
                debug!(error = %err, "closing superseded transport failed");
            }
        }
        self.state = ConnectionState::Connecting;

        match self.connector.connect(&self.endpoint, self.generation) {
            Ok(transport) => {
                info!(endpoint = %self.endpoint, generation = %self.generation, "connecting");
                self.transport = Some(transport);
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint, error = %err, "connect failed");
                let reason = err.to_string();
                self.emit(ClientEvent::Error(err.into()));
                self.on_transport_closed(Some(reason));
            }
        }
    }

    /// Shut down for good.
    ///
    /// Stops reconnecting, drops queued envelopes, pending calls and
    /// subscriptions, closes the transport, emits [`ClientEvent::Close`]
    /// and then removes every observer.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }

        self.reconnect_timer.cancel();
        let queued = self.outbound.clear();
        let pending = self.pending.discard_all();
        let channels = self.subscriptions.clear();
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close() {
                warn!(error = %err, "transport close failed");
            }
        }
        self.state = ConnectionState::Closed;
        info!(
            endpoint = %self.endpoint,
            queued,
            pending,
            channels,
            "client closed"
        );

        self.emit(ClientEvent::Close);
        self.observers.clear();
    }

    /// Issue a call. `callback` fires once with the result or the server's error.
    ///
    /// Returns the correlation id. Failures to build or queue the request
    /// are reported as [`ClientEvent::Error`] and the callback never fires.
    pub fn call<F>(&mut self, method: &str, params: Option<Value>, callback: F) -> CorrelationId
    where
        F: FnOnce(CallResult) + 'static,
    {
        self.request(method, params, Completion::Callback(Box::new(callback)))
    }

    /// Send a notification. No reply is expected and no id goes on the wire;
    /// the returned id is minted like a call's but never sent.
    pub fn notify(&mut self, method: &str, params: Option<Value>) -> CorrelationId {
        let id = self.next_id();
        if self.state == ConnectionState::Closed {
            warn!(method, "client closed; notification dropped");
            return id;
        }

        match encode_request(method, params.as_ref(), None, self.config.token.as_deref()) {
            Ok(text) => {
                if let Err(err) = self.deliver(text, None) {
                    self.emit(ClientEvent::Error(err));
                }
            }
            Err(err) => self.emit(ClientEvent::Error(err.into())),
        }
        id
    }

    /// Subscribe to `channel`. `listener` is installed once the server
    /// acknowledges and then runs for every push on the channel.
    pub fn subscribe<F>(&mut self, channel: &str, listener: F) -> CorrelationId
    where
        F: FnMut(Value) + 'static,
    {
        self.request(
            SUBSCRIBE_METHOD,
            Some(Value::String(channel.to_string())),
            Completion::Subscribe {
                channel: channel.to_string(),
                listener: Box::new(listener),
            },
        )
    }

    /// Unsubscribe from `channel`. The listener is removed on acknowledgement.
    pub fn unsubscribe(&mut self, channel: &str) -> CorrelationId {
        self.request(
            UNSUBSCRIBE_METHOD,
            Some(Value::String(channel.to_string())),
            Completion::Unsubscribe {
                channel: channel.to_string(),
            },
        )
    }

    /// Attach `token` to every request and notification from now on.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.config.token = Some(token.into());
    }

    pub fn clear_token(&mut self) {
        self.config.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    /// Register an observer for lifecycle and error events.
    pub fn on_event<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&ClientEvent) + 'static,
    {
        self.observers.add(Box::new(observer))
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Feed one event from the transport created for `generation`.
    ///
    /// Events from superseded transports, and everything after close,
    /// are ignored.
    pub fn handle_transport_event(&mut self, generation: Generation, event: TransportEvent) {
        if self.state == ConnectionState::Closed {
            debug!(%generation, "event after close ignored");
            return;
        }
        if generation != self.generation || self.transport.is_none() {
            debug!(%generation, current = %self.generation, "stale transport event ignored");
            return;
        }

        match event {
            TransportEvent::Open => self.on_transport_open(),
            TransportEvent::Message(text) => self.on_message(&text),
            TransportEvent::Error(reason) => {
                warn!(%reason, "transport error");
                self.emit(ClientEvent::Error(ClientError::Transport(reason)));
            }
            TransportEvent::Closed { reason } => {
                self.transport = None;
                self.on_transport_closed(reason);
            }
        }
    }

    /// Earliest timer deadline, if any timer is armed.
    pub fn poll_timeout(&self) -> Option<Instant> {
        match (self.reconnect_timer.deadline(), self.outbound.deadline()) {
            (Some(reconnect), Some(retry)) => Some(reconnect.min(retry)),
            (reconnect, retry) => reconnect.or(retry),
        }
    }

    /// Run whatever timers are due.
    pub fn handle_timeout(&mut self) {
        let now = self.clock.now();

        if self.reconnect_timer.is_due(now) {
            self.reconnect_timer
                .reschedule(now, self.config.reconnect_interval);
            debug!(endpoint = %self.endpoint, "reconnect attempt");
            self.open();
        }

        let abandoned = self.outbound.on_timeout(self.transport.as_mut(), now);
        for err in abandoned {
            if let ClientError::SendAbandoned { id: Some(id), .. } = &err {
                if let Some(completion) = self.pending.take(id) {
                    debug!(%id, ?completion, "pending call dropped with its envelope");
                }
            }
            self.emit(ClientEvent::Error(err));
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Channels with an installed listener, sorted.
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.subscriptions.channels()
    }

    /// Envelopes waiting for a ready transport.
    pub fn queued_sends(&self) -> usize {
        self.outbound.len()
    }

    fn request(
        &mut self,
        method: &str,
        params: Option<Value>,
        completion: Completion,
    ) -> CorrelationId {
        let id = self.next_id();
        if self.state == ConnectionState::Closed {
            warn!(method, %id, "client closed; call dropped");
            return id;
        }

        let text = match encode_request(
            method,
            params.as_ref(),
            Some(&id),
            self.config.token.as_deref(),
        ) {
            Ok(text) => text,
            Err(err) => {
                self.emit(ClientEvent::Error(err.into()));
                return id;
            }
        };

        self.pending.register(id.clone(), completion);
        if let Err(err) = self.deliver(text, Some(id.clone())) {
            self.pending.take(&id);
            self.emit(ClientEvent::Error(err));
        }
        id
    }

    fn deliver(&mut self, text: String, id: Option<CorrelationId>) -> Result<(), ClientError> {
        let now = self.clock.now();
        match self.outbound.send(text, id, self.transport.as_mut(), now)? {
            Delivery::Sent => debug!("envelope sent"),
            Delivery::Queued => debug!(queued = self.outbound.len(), "envelope queued"),
        }
        Ok(())
    }

    fn next_id(&mut self) -> CorrelationId {
        loop {
            let id = self.ids.next();
            if !self.pending.contains(&id) {
                return id;
            }
        }
    }

    fn on_transport_open(&mut self) {
        let reconnected = self.opened_once;
        self.opened_once = true;
        self.state = ConnectionState::Open;
        if self.reconnect_timer.cancel() {
            debug!("reconnect timer cancelled");
        }
        info!(endpoint = %self.endpoint, generation = %self.generation, reconnected, "open");

        if let Some(transport) = self.transport.as_mut() {
            self.outbound.flush(transport);
        }
        if reconnected && self.config.resubscribe_on_reconnect {
            self.resubscribe();
        }
        self.emit(ClientEvent::Open);
    }

    fn on_transport_closed(&mut self, reason: Option<String>) {
        self.state = ConnectionState::LostReconnecting;
        info!(endpoint = %self.endpoint, reason = ?reason, "connection lost");
        self.emit(ClientEvent::Lost { reason });

        let now = self.clock.now();
        if self
            .reconnect_timer
            .arm(now, self.config.reconnect_interval)
        {
            debug!(interval = ?self.config.reconnect_interval, "reconnect timer armed");
        }
    }

    fn on_message(&mut self, text: &str) {
        let envelope = match decode(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping undecodable message");
                self.emit(ClientEvent::Error(err.into()));
                return;
            }
        };

        match envelope {
            Envelope::Success { id, result } => {
                if !self.pending.resolve(&id, Ok(result), &mut self.subscriptions) {
                    debug!(%id, "reply for unknown or settled id ignored");
                }
            }
            Envelope::Error { id, error } => {
                let reported = remote_error_event(id.clone(), &error);
                if let Some(id) = id {
                    self.pending.resolve(&id, Err(error), &mut self.subscriptions);
                }
                self.emit(ClientEvent::Error(reported));
            }
            Envelope::Push { channel, payload } => {
                if !self.subscriptions.dispatch(&channel, payload) {
                    debug!(%channel, "push for unsubscribed channel ignored");
                }
            }
            other @ (Envelope::Request { .. } | Envelope::Notification { .. }) => {
                warn!(kind = other.kind(), "inbound message not handled by a client");
                self.emit(ClientEvent::Error(ClientError::UnhandledShape));
            }
        }
    }

    fn resubscribe(&mut self) {
        for channel in self.subscriptions.channels() {
            debug!(%channel, "re-subscribing");
            self.request(
                SUBSCRIBE_METHOD,
                Some(Value::String(channel.clone())),
                Completion::Resubscribe { channel },
            );
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        if let ClientEvent::Error(err) = &event {
            debug!(error = %err, "client error");
        }
        self.observers.emit(&event);
    }
}

fn remote_error_event(id: Option<CorrelationId>, error: &RemoteError) -> ClientError {
    match (error.code, error.message.as_deref()) {
        (Some(code), Some(message)) if error.is_well_formed() => ClientError::Remote {
            id,
            code,
            message: message.to_string(),
            data: error.data.clone(),
        },
        _ => ClientError::MalformedRemoteError { id },
    }
}

impl<C: Connector> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("pending", &self.pending.len())
            .field("subscriptions", &self.subscriptions)
            .field("queued", &self.outbound.len())
            .field("config", &self.config)
            .finish()
    }
}
