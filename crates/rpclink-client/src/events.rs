use std::fmt;

use crate::error::ClientError;

/// Lifecycle and error notifications delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The transport became ready.
    Open,
    /// The client was closed explicitly. Always the last event.
    Close,
    /// The transport went away; a reconnect is scheduled.
    Lost { reason: Option<String> },
    /// Something went wrong. The client keeps running.
    Error(ClientError),
}

/// Handle returned by [`Observers::add`], used to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

pub type Observer = Box<dyn FnMut(&ClientEvent)>;

/// Ordered list of event observers.
#[derive(Default)]
pub struct Observers {
    next: u64,
    entries: Vec<(ObserverId, Observer)>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observer: Observer) -> ObserverId {
        self.next += 1;
        let id = ObserverId(self.next);
        self.entries.push((id, observer));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Deliver `event` to every observer in registration order.
    pub fn emit(&mut self, event: &ClientEvent) {
        for (_, observer) in self.entries.iter_mut() {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
