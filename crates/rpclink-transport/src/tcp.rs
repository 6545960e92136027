//! Newline-delimited text messages over TCP (tokio).
//!
//! Each connect spawns one task that owns the socket. Outbound text goes
//! through an unbounded channel into that task; inbound lines and
//! lifecycle changes come back on the connector's event channel, tagged
//! with the transport's [`Generation`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Generation, ReadyState, Transport, TransportEvent};

/// Maximum accepted line length (16 MiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Receiving side of a connector's event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<(Generation, TransportEvent)>;

enum Outbound {
    Text(String),
    Close,
}

/// Connector for `host:port` endpoints. Must be used inside a tokio runtime.
#[derive(Debug, Clone)]
pub struct TcpLineConnector {
    events: mpsc::UnboundedSender<(Generation, TransportEvent)>,
    max_line_length: usize,
}

impl TcpLineConnector {
    /// Create a connector and the receiver its transports report into.
    pub fn new() -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                max_line_length: DEFAULT_MAX_LINE_LENGTH,
            },
            rx,
        )
    }

    /// Override the maximum inbound line length.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

impl Connector for TcpLineConnector {
    type Transport = TcpLineTransport;

    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<TcpLineTransport> {
        let endpoint = parse_endpoint(endpoint)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let state = Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8()));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        runtime.spawn(run_link(
            endpoint,
            generation,
            self.max_line_length,
            state.clone(),
            outbound_rx,
            self.events.clone(),
        ));

        Ok(TcpLineTransport {
            state,
            outbound: outbound_tx,
        })
    }
}

/// Handle to one TCP link.
#[derive(Debug)]
pub struct TcpLineTransport {
    state: Arc<AtomicU8>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outbound::Text(text) => write!(f, "Text({} bytes)", text.len()),
            Outbound::Close => f.write_str("Close"),
        }
    }
}

impl Transport for TcpLineTransport {
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn send(&mut self, text: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        self.outbound
            .send(Outbound::Text(text.to_string()))
            .map_err(|_| TransportError::Shutdown)
    }

    fn close(&mut self) -> Result<()> {
        if self.ready_state() == ReadyState::Closed {
            return Ok(());
        }
        self.state
            .store(ReadyState::Closing.as_u8(), Ordering::Release);
        // The link task may already be gone; nothing left to close then.
        let _ = self.outbound.send(Outbound::Close);
        Ok(())
    }
}

/// Normalize `host:port` or `tcp://host:port/` to `host:port`.
pub fn parse_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint
        .strip_prefix("tcp://")
        .unwrap_or(endpoint)
        .trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.contains(':') {
        return Err(TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "expected host:port".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

async fn run_link(
    endpoint: String,
    generation: Generation,
    max_line_length: usize,
    state: Arc<AtomicU8>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<(Generation, TransportEvent)>,
) {
    let emit = |event: TransportEvent| {
        // A dropped receiver means nobody drives the client anymore.
        let _ = events.send((generation, event));
    };

    let stream = match TcpStream::connect(&endpoint).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!(%endpoint, %generation, error = %err, "tcp connect failed");
            state.store(ReadyState::Closed.as_u8(), Ordering::Release);
            emit(TransportEvent::Error(err.to_string()));
            emit(TransportEvent::Closed {
                reason: Some(err.to_string()),
            });
            return;
        }
    };

    // close() may have been called while the connect was in flight.
    if state
        .compare_exchange(
            ReadyState::Connecting.as_u8(),
            ReadyState::Open.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err()
    {
        state.store(ReadyState::Closed.as_u8(), Ordering::Release);
        emit(TransportEvent::Closed {
            reason: Some("closed before open".to_string()),
        });
        return;
    }

    info!(%endpoint, %generation, "tcp link open");
    emit(TransportEvent::Open);

    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(max_line_length));
    let reason = loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(err) = framed.send(text).await {
                        emit(TransportEvent::Error(err.to_string()));
                        break Some(err.to_string());
                    }
                }
                Some(Outbound::Close) | None => break None,
            },
            line = framed.next() => match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    debug!(%generation, bytes = line.len(), "tcp line received");
                    emit(TransportEvent::Message(line));
                }
                Some(Err(err)) => {
                    emit(TransportEvent::Error(err.to_string()));
                    break Some(err.to_string());
                }
                None => break Some("connection closed by peer".to_string()),
            },
        }
    };

    state.store(ReadyState::Closed.as_u8(), Ordering::Release);
    info!(%endpoint, %generation, "tcp link closed");
    emit(TransportEvent::Closed { reason });
}
