//! In-process transport for tests and demos.
//!
//! A [`MemoryConnector`] hands out [`MemoryTransport`]s that record every
//! message sent through them. The paired [`MemoryHandle`] lets the owner
//! inspect traffic and flip the readiness of the current link. No events
//! are generated here: whoever drives the client feeds them explicitly.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{Connector, Generation, ReadyState, Transport};

#[derive(Debug, Default)]
struct Shared {
    connects: Vec<(String, Generation)>,
    sent: Vec<(Generation, String)>,
    current: Option<Rc<RefCell<Link>>>,
    failures_left: usize,
    closes: usize,
}

#[derive(Debug)]
struct Link {
    generation: Generation,
    state: ReadyState,
}

/// Inspection and control side of a memory transport pair.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    shared: Rc<RefCell<Shared>>,
}

impl MemoryHandle {
    /// Number of connect attempts made through the connector.
    pub fn connect_count(&self) -> usize {
        self.shared.borrow().connects.len()
    }

    /// Endpoint and generation of every connect attempt, oldest first.
    pub fn connects(&self) -> Vec<(String, Generation)> {
        self.shared.borrow().connects.clone()
    }

    /// Generation of the most recent transport, if any was created.
    pub fn current_generation(&self) -> Option<Generation> {
        self.shared
            .borrow()
            .current
            .as_ref()
            .map(|link| link.borrow().generation)
    }

    /// Readiness of the most recent transport.
    pub fn ready_state(&self) -> Option<ReadyState> {
        self.shared
            .borrow()
            .current
            .as_ref()
            .map(|link| link.borrow().state)
    }

    /// Force the readiness of the most recent transport.
    pub fn set_ready_state(&self, state: ReadyState) {
        if let Some(link) = self.shared.borrow().current.as_ref() {
            link.borrow_mut().state = state;
        }
    }

    /// Make the next `count` connect attempts fail with `ConnectionRefused`.
    pub fn fail_next_connects(&self, count: usize) {
        self.shared.borrow_mut().failures_left = count;
    }

    /// Every message sent so far, in send order.
    pub fn sent(&self) -> Vec<String> {
        self.shared
            .borrow()
            .sent
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Messages sent so far, each tagged with the generation that carried it.
    pub fn sent_with_generation(&self) -> Vec<(Generation, String)> {
        self.shared.borrow().sent.clone()
    }

    /// Drain the recorded messages.
    pub fn take_sent(&self) -> Vec<String> {
        std::mem::take(&mut self.shared.borrow_mut().sent)
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }

    /// Number of explicit `close()` calls across all transports.
    pub fn close_count(&self) -> usize {
        self.shared.borrow().closes
    }
}

/// Connector producing [`MemoryTransport`]s.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    handle: MemoryHandle,
}

impl MemoryConnector {
    /// Create a connector and its inspection handle.
    pub fn new() -> (Self, MemoryHandle) {
        let handle = MemoryHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    fn connect(&mut self, endpoint: &str, generation: Generation) -> Result<MemoryTransport> {
        let mut shared = self.handle.shared.borrow_mut();
        shared.connects.push((endpoint.to_string(), generation));

        if shared.failures_left > 0 {
            shared.failures_left -= 1;
            return Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "memory connector refused",
                ),
            });
        }

        let link = Rc::new(RefCell::new(Link {
            generation,
            state: ReadyState::Connecting,
        }));
        shared.current = Some(link.clone());
        debug!(endpoint, %generation, "memory transport created");

        Ok(MemoryTransport {
            link,
            shared: self.handle.shared.clone(),
        })
    }
}

/// One in-memory link. Starts in [`ReadyState::Connecting`].
#[derive(Debug)]
pub struct MemoryTransport {
    link: Rc<RefCell<Link>>,
    shared: Rc<RefCell<Shared>>,
}

impl Transport for MemoryTransport {
    fn ready_state(&self) -> ReadyState {
        self.link.borrow().state
    }

    fn send(&mut self, text: &str) -> Result<()> {
        let link = self.link.borrow();
        if link.state != ReadyState::Open {
            return Err(TransportError::NotReady);
        }
        self.shared
            .borrow_mut()
            .sent
            .push((link.generation, text.to_string()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.link.borrow_mut().state = ReadyState::Closed;
        self.shared.borrow_mut().closes += 1;
        Ok(())
    }
}
