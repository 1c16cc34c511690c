//! In-process event bus: live broadcast plus a bounded history ring.
//!
//! # Design
//! - Identifier assignment and history append happen under one lock, so the
//!   ring is always ordered by id.
//! - Broadcasting never fails the publisher; a bus with no subscribers still
//!   records history.
//! - Slow subscribers lag and lose the oldest events; they can catch up from
//!   [`EventBus::backlog_since`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::{EventBusResult, EventSink};
use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Live stream handed to subscribers.
pub type EventStream = BroadcastStream<EventEnvelope>;

#[derive(Debug)]
struct History {
    next_id: EventId,
    ring: VecDeque<EventEnvelope>,
}

/// Cloneable handle to the shared bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    history: Arc<Mutex<History>>,
    capacity: usize,
}

impl EventBus {
    /// Bus keeping the last `capacity` events (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Arc::new(Mutex::new(History {
                next_id: 1,
                ring: VecDeque::with_capacity(capacity),
            })),
            capacity,
        }
    }

    /// Bus with [`DEFAULT_REPLAY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Stream of events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Record and broadcast `event`, returning its identifier.
    pub fn publish(&self, event: Event) -> EventId {
        let envelope = {
            let mut history = self.history();
            let envelope = EventEnvelope {
                id: history.next_id,
                timestamp: Utc::now(),
                event,
            };
            history.next_id = history.next_id.saturating_add(1);
            if history.ring.len() == self.capacity {
                history.ring.pop_front();
            }
            history.ring.push_back(envelope.clone());
            envelope
        };
        let id = envelope.id;
        self.sender.send(envelope).ok();
        id
    }

    /// Identifier of the newest recorded event.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.history().ring.back().map(|envelope| envelope.id)
    }

    /// Recorded events newer than `id`, oldest first.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        self.history()
            .ring
            .iter()
            .filter(|envelope| envelope.id > id)
            .cloned()
            .collect()
    }

    /// Recorded events of one kind (see [`Event::kind`]), oldest first.
    #[must_use]
    pub fn backlog_of(&self, kind: &str) -> Vec<EventEnvelope> {
        self.history()
            .ring
            .iter()
            .filter(|envelope| envelope.event.kind() == kind)
            .cloned()
            .collect()
    }

    fn history(&self) -> MutexGuard<'_, History> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: Event) -> EventBusResult<EventId> {
        Ok(self.publish(event))
    }
}
