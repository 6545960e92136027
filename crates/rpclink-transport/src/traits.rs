use std::fmt;

use crate::error::Result;

/// Readiness of a transport handle, mirroring the usual socket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    /// The connection is being established. Sends must wait.
    Connecting,
    /// The connection is established and can carry messages.
    Open,
    /// A close has been requested but not yet observed.
    Closing,
    /// The connection is gone.
    Closed,
}

impl ReadyState {
    pub fn as_u8(self) -> u8 {
        match self {
            ReadyState::Connecting => 0,
            ReadyState::Open => 1,
            ReadyState::Closing => 2,
            ReadyState::Closed => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Ordinal of a transport instance created by a connector.
///
/// Every connect attempt gets a fresh generation. Events are delivered
/// tagged with the generation that produced them so that a client can
/// ignore traffic from transports it has already replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    /// The generation that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established.
    Open,
    /// One complete text message arrived.
    Message(String),
    /// The transport reported an error. A `Closed` event usually follows.
    Error(String),
    /// The connection is gone, whether closed locally or remotely.
    Closed { reason: Option<String> },
}

/// A connected (or connecting) duplex message channel.
pub trait Transport {
    /// Current readiness.
    fn ready_state(&self) -> ReadyState;

    /// True when a message handed to [`Transport::send`] would be delivered.
    fn is_ready(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    /// Hand one complete text message to the transport.
    fn send(&mut self, text: &str) -> Result<()>;

    /// Request the connection to close. A `Closed` event follows.
    fn close(&mut self) -> Result<()>;
}

/// Factory for transports. One call to `connect` is one connection attempt.
///
/// The connector is responsible for delivering the new transport's
/// events to whoever drives the client, tagged with `generation`.
pub trait Connector {
    type Transport: Transport;

    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<Self::Transport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_round_trips_through_u8() {
        for state in [
            ReadyState::Connecting,
            ReadyState::Open,
            ReadyState::Closing,
            ReadyState::Closed,
        ] {
            assert_eq!(ReadyState::from_u8(state.as_u8()), state);
        }
        assert_eq!(ReadyState::from_u8(200), ReadyState::Closed);
    }

    #[test]
    fn generation_advances() {
        let first = Generation::default();
        assert_eq!(first.next(), Generation(1));
        assert!(first.next() > first);
        assert_eq!(Generation(7).to_string(), "#7");
    }
}
