//! Duplex message transport abstraction.
//!
//! The lowest layer of rpclink. A [`Connector`] creates [`Transport`]
//! handles; each handle carries whole text messages and reports its
//! lifecycle as [`TransportEvent`]s tagged with a [`Generation`].
//!
//! Provided implementations:
//! - [`MemoryConnector`] — in-process, for tests and demos
//! - `TcpLineConnector` — newline-delimited text over TCP (behind `async`)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "async")]
pub mod tcp;

pub use error::{Result, TransportError};
pub use memory::{MemoryConnector, MemoryHandle, MemoryTransport};
pub use traits::{Connector, Generation, ReadyState, Transport, TransportEvent};

#[cfg(feature = "async")]
pub use tcp::{parse_endpoint, EventReceiver, TcpLineConnector, TcpLineTransport};
