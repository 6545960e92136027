use std::collections::HashMap;
use std::fmt;

use rpclink_envelope::{CorrelationId, RemoteError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::subscriptions::{PushListener, Subscriptions};

/// What a call resolves to: the `result` member, or the server's error.
pub type CallResult = Result<Value, RemoteError>;

/// One-shot callback for a caller's call.
pub type CallCallback = Box<dyn FnOnce(CallResult)>;

/// Acknowledgement status for a successful subscribe.
pub const STATUS_SUBSCRIBED: &str = "subscribed";
/// Acknowledgement status for a successful unsubscribe.
pub const STATUS_UNSUBSCRIBED: &str = "unsubscribed";

/// What happens when a pending call's reply arrives.
pub enum Completion {
    /// Hand the outcome to the caller.
    Callback(CallCallback),
    /// Install `listener` once the server acknowledges the subscription.
    Subscribe {
        channel: String,
        listener: PushListener,
    },
    /// Re-subscription after reconnect; the listener is already installed.
    Resubscribe { channel: String },
    /// Remove the channel's listener once the server acknowledges.
    Unsubscribe { channel: String },
}

impl Completion {
    /// Consume the completion with the reply's outcome.
    pub fn complete(self, outcome: CallResult, subscriptions: &mut Subscriptions) {
        match self {
            Completion::Callback(callback) => callback(outcome),
            Completion::Subscribe { channel, listener } => {
                match acknowledged_channel(&outcome, STATUS_SUBSCRIBED, &channel) {
                    Some(acked) => {
                        debug!(channel = %acked, "subscribed");
                        subscriptions.subscribe(acked, listener);
                    }
                    None => warn!(%channel, "subscription not acknowledged"),
                }
            }
            Completion::Resubscribe { channel } => {
                if acknowledged_channel(&outcome, STATUS_SUBSCRIBED, &channel).is_none() {
                    warn!(%channel, "re-subscription not acknowledged");
                }
            }
            Completion::Unsubscribe { channel } => {
                match acknowledged_channel(&outcome, STATUS_UNSUBSCRIBED, &channel) {
                    Some(acked) => {
                        debug!(channel = %acked, "unsubscribed");
                        subscriptions.unsubscribe(&acked);
                    }
                    None => warn!(%channel, "unsubscription not acknowledged"),
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Completion::Callback(_) => "callback",
            Completion::Subscribe { .. } => "subscribe",
            Completion::Resubscribe { .. } => "resubscribe",
            Completion::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// `{"status": <expected>, "channel": …}` → the acknowledged channel.
///
/// The server's `channel` wins over the one requested.
fn acknowledged_channel(outcome: &CallResult, expected: &str, requested: &str) -> Option<String> {
    let result = outcome.as_ref().ok()?;
    if result.get("status").and_then(Value::as_str) != Some(expected) {
        return None;
    }
    Some(
        result
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or(requested)
            .to_string(),
    )
}

/// Correlation id → completion for every call still awaiting a reply.
///
/// Each completion fires at most once: resolving removes it.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: HashMap<CorrelationId, Completion>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion. Returns false (and drops it) if `id` is already pending.
    pub fn register(&mut self, id: CorrelationId, completion: Completion) -> bool {
        if self.calls.contains_key(&id) {
            warn!(%id, "correlation id already pending");
            return false;
        }
        self.calls.insert(id, completion);
        true
    }

    /// Fire the completion for `id`. Unknown or already-resolved ids return false.
    pub fn resolve(
        &mut self,
        id: &CorrelationId,
        outcome: CallResult,
        subscriptions: &mut Subscriptions,
    ) -> bool {
        match self.calls.remove(id) {
            Some(completion) => {
                completion.complete(outcome, subscriptions);
                true
            }
            None => false,
        }
    }

    /// Remove a completion without firing it.
    pub fn take(&mut self, id: &CorrelationId) -> Option<Completion> {
        self.calls.remove(id)
    }

    /// Drop every completion unfired. Returns how many were discarded.
    pub fn discard_all(&mut self) -> usize {
        let count = self.calls.len();
        self.calls.clear();
        count
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.calls.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
