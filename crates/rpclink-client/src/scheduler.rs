use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rpclink_envelope::CorrelationId;
use rpclink_transport::Transport;
use tracing::{debug, warn};

use crate::clock::Timer;
use crate::error::ClientError;

/// How an envelope handed to [`SendScheduler::send`] was dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the transport.
    Sent,
    /// Waiting for the transport to become ready.
    Queued,
}

#[derive(Debug)]
struct Queued {
    text: String,
    id: Option<CorrelationId>,
    attempts: u32,
}

/// FIFO of envelopes waiting for a ready transport.
///
/// The queue is retried whenever the retry timer expires and whenever the
/// owner calls [`SendScheduler::flush`] (on every open). Nothing is ever
/// written while the transport is not ready.
#[derive(Debug)]
pub struct SendScheduler {
    queue: VecDeque<Queued>,
    retry: Timer,
    interval: Duration,
    max_queued: usize,
    max_attempts: Option<u32>,
}

impl SendScheduler {
    pub fn new(interval: Duration, max_queued: usize, max_attempts: Option<u32>) -> Self {
        Self {
            queue: VecDeque::new(),
            retry: Timer::default(),
            interval,
            max_queued,
            max_attempts,
        }
    }

    /// Deliver `text` now if possible, otherwise queue it behind earlier envelopes.
    ///
    /// `id` is the correlation id the envelope carries, if any; it is
    /// reported back should the envelope be abandoned.
    pub fn send<T: Transport>(
        &mut self,
        text: String,
        id: Option<CorrelationId>,
        transport: Option<&mut T>,
        now: Instant,
    ) -> Result<Delivery, ClientError> {
        if self.queue.is_empty() {
            if let Some(transport) = transport.filter(|transport| transport.is_ready()) {
                match transport.send(&text) {
                    Ok(()) => return Ok(Delivery::Sent),
                    Err(err) => warn!(error = %err, "send failed; queueing for retry"),
                }
            }
        }

        if self.queue.len() >= self.max_queued {
            return Err(ClientError::QueueFull {
                capacity: self.max_queued,
            });
        }

        self.queue.push_back(Queued {
            text,
            id,
            attempts: 0,
        });
        if self.retry.arm(now, self.interval) {
            debug!(queued = self.queue.len(), "send retry timer armed");
        }
        Ok(Delivery::Queued)
    }

    /// Write queued envelopes in order while the transport stays ready.
    /// Returns how many were written.
    pub fn flush<T: Transport>(&mut self, transport: &mut T) -> usize {
        let mut sent = 0usize;
        while transport.is_ready() {
            let Some(front) = self.queue.front() else {
                break;
            };
            if let Err(err) = transport.send(&front.text) {
                warn!(error = %err, "flush interrupted");
                break;
            }
            self.queue.pop_front();
            sent += 1;
        }

        if self.queue.is_empty() {
            self.retry.cancel();
        }
        if sent > 0 {
            debug!(sent, remaining = self.queue.len(), "flushed queued envelopes");
        }
        sent
    }

    /// Run the retry timer if it is due.
    ///
    /// Envelopes still undelivered count one more failed attempt; those
    /// over `max_attempts` are dropped and reported with their id.
    pub fn on_timeout<T: Transport>(
        &mut self,
        transport: Option<&mut T>,
        now: Instant,
    ) -> Vec<ClientError> {
        if !self.retry.is_due(now) {
            return Vec::new();
        }
        self.retry.cancel();

        if let Some(transport) = transport {
            self.flush(transport);
        }
        if self.queue.is_empty() {
            return Vec::new();
        }

        let mut abandoned = Vec::new();
        for queued in self.queue.iter_mut() {
            queued.attempts = queued.attempts.saturating_add(1);
        }
        if let Some(max) = self.max_attempts {
            self.queue.retain(|queued| {
                if queued.attempts >= max {
                    abandoned.push(ClientError::SendAbandoned {
                        id: queued.id.clone(),
                        attempts: queued.attempts,
                    });
                    false
                } else {
                    true
                }
            });
        }
        if !abandoned.is_empty() {
            warn!(dropped = abandoned.len(), "abandoned undeliverable envelopes");
        }

        if !self.queue.is_empty() {
            self.retry.arm(now, self.interval);
        }
        abandoned
    }

    /// Drop everything queued and stop retrying. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        self.retry.cancel();
        count
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.retry.deadline()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rpclink_transport::{
        Connector, Generation, MemoryConnector, MemoryHandle, MemoryTransport, ReadyState,
    };

    use super::*;
    use crate::clock::{Clock, ManualClock};

    const RETRY: Duration = Duration::from_millis(1000);

    fn transport() -> (MemoryTransport, MemoryHandle) {
        let (mut connector, handle) = MemoryConnector::new();
        let transport = connector
            .connect("mem://scheduler", Generation(1))
            .expect("memory connect should succeed");
        (transport, handle)
    }

    #[test]
    fn ready_transport_sends_immediately() {
        let clock = ManualClock::new();
        let (mut link, handle) = transport();
        handle.set_ready_state(ReadyState::Open);
        let mut scheduler = SendScheduler::new(RETRY, 16, None);

        let delivery = scheduler
            .send("a".to_string(), None, Some(&mut link), clock.now())
            .expect("send should be accepted");
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(handle.sent(), vec!["a".to_string()]);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn not_ready_defers_until_ready() {
        let clock = ManualClock::new();
        let (mut link, handle) = transport();
        let mut scheduler = SendScheduler::new(RETRY, 16, None);

        let delivery = scheduler
            .send("late".to_string(), None, Some(&mut link), clock.now())
            .expect("send should be accepted");
        assert_eq!(delivery, Delivery::Queued);

        clock.advance(RETRY);
        assert!(scheduler.on_timeout(Some(&mut link), clock.now()).is_empty());
        assert!(handle.sent().is_empty(), "must not deliver before ready");
        assert_eq!(scheduler.deadline(), Some(clock.now() + RETRY));

        handle.set_ready_state(ReadyState::Open);
        clock.advance(RETRY);
        scheduler.on_timeout(Some(&mut link), clock.now());
        assert_eq!(handle.sent(), vec!["late".to_string()]);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn queue_preserves_order_behind_pending_envelopes() {
        let clock = ManualClock::new();
        let (mut link, handle) = transport();
        let mut scheduler = SendScheduler::new(RETRY, 16, None);

        scheduler
            .send("1".to_string(), None, Some(&mut link), clock.now())
            .expect("first accepted");
        handle.set_ready_state(ReadyState::Open);
        let delivery = scheduler
            .send("2".to_string(), None, Some(&mut link), clock.now())
            .expect("second accepted");
        assert_eq!(delivery, Delivery::Queued, "must not overtake queued envelope");

        assert_eq!(scheduler.flush(&mut link), 2);
        assert_eq!(handle.sent(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn no_transport_queues() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 16, None);
        let delivery = scheduler
            .send::<MemoryTransport>("x".to_string(), None, None, clock.now())
            .expect("send should be accepted");
        assert_eq!(delivery, Delivery::Queued);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn full_queue_rejects() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 1, None);
        scheduler
            .send::<MemoryTransport>("a".to_string(), None, None, clock.now())
            .expect("first accepted");
        let err = scheduler
            .send::<MemoryTransport>("b".to_string(), None, None, clock.now())
            .expect_err("second should overflow");
        assert_eq!(err, ClientError::QueueFull { capacity: 1 });
    }

    #[test]
    fn attempts_are_bounded_when_configured() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 16, Some(2));
        scheduler
            .send::<MemoryTransport>("doomed".to_string(), None, None, clock.now())
            .expect("accepted");

        clock.advance(RETRY);
        assert!(scheduler
            .on_timeout::<MemoryTransport>(None, clock.now())
            .is_empty());
        clock.advance(RETRY);
        let abandoned = scheduler.on_timeout::<MemoryTransport>(None, clock.now());

        assert_eq!(
            abandoned,
            vec![ClientError::SendAbandoned {
                id: None,
                attempts: 2
            }]
        );
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn abandoned_envelopes_report_their_ids() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 16, Some(1));
        let id = CorrelationId::from("call-1");
        scheduler
            .send::<MemoryTransport>("call".to_string(), Some(id.clone()), None, clock.now())
            .expect("accepted");
        scheduler
            .send::<MemoryTransport>("note".to_string(), None, None, clock.now())
            .expect("accepted");

        clock.advance(RETRY);
        let abandoned = scheduler.on_timeout::<MemoryTransport>(None, clock.now());
        assert_eq!(
            abandoned,
            vec![
                ClientError::SendAbandoned {
                    id: Some(id),
                    attempts: 1
                },
                ClientError::SendAbandoned {
                    id: None,
                    attempts: 1
                },
            ]
        );
    }

    #[test]
    fn timer_is_not_double_armed() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 16, None);
        scheduler
            .send::<MemoryTransport>("a".to_string(), None, None, clock.now())
            .expect("accepted");
        let first = scheduler.deadline();
        clock.advance(Duration::from_millis(300));
        scheduler
            .send::<MemoryTransport>("b".to_string(), None, None, clock.now())
            .expect("accepted");
        assert_eq!(scheduler.deadline(), first);
    }

    #[test]
    fn clear_stops_retrying() {
        let clock = ManualClock::new();
        let mut scheduler = SendScheduler::new(RETRY, 16, None);
        scheduler
            .send::<MemoryTransport>("a".to_string(), None, None, clock.now())
            .expect("accepted");
        assert_eq!(scheduler.clear(), 1);
        assert_eq!(scheduler.deadline(), None);
    }
}
