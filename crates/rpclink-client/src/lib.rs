//! Auto-reconnecting JSON-RPC 2.0 client.
//!
//! [`Client`] multiplexes calls, notifications and channel subscriptions
//! over one transport from `rpclink-transport`:
//! - replies are matched to calls by correlation id, each callback fires once
//! - pushes are routed to the listener of their channel
//! - a lost transport is reopened on a timer; pending calls and
//!   subscriptions survive the reconnect
//! - outbound envelopes wait in a bounded queue until the transport is ready
//!
//! The client is sans-IO. Hosts feed it transport events and timer
//! expiries; with the `async` feature, [`driver::drive_until`] does that
//! on tokio.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod pending;
pub mod scheduler;
pub mod subscriptions;

#[cfg(feature = "async")]
pub mod driver;

pub use client::{Client, ConnectionState, SUBSCRIBE_METHOD, UNSUBSCRIBE_METHOD};
pub use clock::{Clock, ManualClock, SystemClock, Timer};
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{ClientEvent, ObserverId};
pub use id::IdGenerator;
pub use pending::{CallResult, Completion, PendingCalls};
pub use scheduler::{Delivery, SendScheduler};
pub use subscriptions::{PushListener, Subscriptions};

#[cfg(feature = "async")]
pub use driver::{drive_until, DriveOutcome};
