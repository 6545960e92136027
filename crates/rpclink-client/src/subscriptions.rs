use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::debug;

/// Listener invoked for every push on a subscribed channel.
pub type PushListener = Box<dyn FnMut(Value)>;

/// Channel name → the one active listener for that channel.
///
/// Subscribing again to a channel replaces its listener.
#[derive(Default)]
pub struct Subscriptions {
    listeners: BTreeMap<String, PushListener>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `listener` for `channel`. Returns true if it replaced one.
    pub fn subscribe(&mut self, channel: impl Into<String>, listener: PushListener) -> bool {
        let channel = channel.into();
        let replaced = self.listeners.insert(channel.clone(), listener).is_some();
        if replaced {
            debug!(%channel, "replacing channel listener");
        }
        replaced
    }

    /// Remove the listener for `channel`. Returns true if there was one.
    pub fn unsubscribe(&mut self, channel: &str) -> bool {
        self.listeners.remove(channel).is_some()
    }

    /// Hand `payload` to the channel's listener. Returns false if nobody listens.
    pub fn dispatch(&mut self, channel: &str, payload: Value) -> bool {
        match self.listeners.get_mut(channel) {
            Some(listener) => {
                listener(payload);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.listeners.contains_key(channel)
    }

    /// Subscribed channel names in sorted order.
    pub fn channels(&self) -> Vec<String> {
        self.listeners.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Drop every listener. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.listeners.len();
        self.listeners.clear();
        count
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriptions")
            .field("channels", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}
