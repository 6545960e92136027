//! Auto-reconnecting JSON-RPC 2.0 client with channel subscriptions.
//!
//! rpclink multiplexes calls, notifications and pub/sub channels over one
//! persistent connection, recovering from connection loss without losing
//! pending calls or subscriptions.
//!
//! # Crate Structure
//!
//! - [`transport`] — Duplex message transports (in-memory, TCP lines behind `async`)
//! - [`envelope`] — JSON-RPC 2.0 envelope encoding and classification
//! - [`client`] — Correlation, subscriptions, send scheduling and reconnect

/// Re-export transport types.
pub mod transport {
    pub use rpclink_transport::*;
}

/// Re-export envelope types.
pub mod envelope {
    pub use rpclink_envelope::*;
}

/// Re-export client types.
pub mod client {
    pub use rpclink_client::*;
}
