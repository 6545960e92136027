//! Walk a client through a session on the in-memory transport.
//!
//! Plays the server by hand: opens the link, answers a call, acknowledges
//! a subscription, pushes a payload and finally drops the connection.
//!
//! Run with:
//!   cargo run --example memory-session

use std::time::Duration;

use rpclink::client::{Client, ClientConfig, ManualClock};
use rpclink::transport::{MemoryConnector, ReadyState, TransportEvent};
use serde_json::{json, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (connector, link) = MemoryConnector::new();
    let clock = ManualClock::new();
    let mut client =
        Client::connect_with("mem://demo", connector, ClientConfig::default(), clock.clone());
    client.on_event(|event| eprintln!("event: {event:?}"));

    link.set_ready_state(ReadyState::Open);
    client.handle_transport_event(client.generation(), TransportEvent::Open);

    let id = client.call("sum", Some(json!([2, 3])), |outcome| {
        eprintln!("sum => {outcome:?}");
    });
    let sub = client.subscribe("clock", |payload| eprintln!("clock push: {payload}"));

    for text in link.take_sent() {
        eprintln!("client sent: {text}");
    }

    let replies: [Value; 3] = [
        json!({"jsonrpc": "2.0", "id": id.as_str(), "result": 5}),
        json!({"jsonrpc": "2.0", "id": sub.as_str(), "result": {"status": "subscribed", "channel": "clock"}}),
        json!({"jsonrpc": "2.0", "channel": "clock", "payload": {"tick": 1}}),
    ];
    for reply in replies {
        client.handle_transport_event(client.generation(), TransportEvent::Message(reply.to_string()));
    }

    link.set_ready_state(ReadyState::Closed);
    client.handle_transport_event(client.generation(), TransportEvent::Closed { reason: None });
    eprintln!("state after loss: {:?}", client.state());

    clock.advance(Duration::from_secs(5));
    client.handle_timeout();
    eprintln!(
        "state after reconnect attempt: {:?} (generation {})",
        client.state(),
        client.generation()
    );

    client.close();
    Ok(())
}
