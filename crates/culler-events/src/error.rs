//! Publishing seam and its error type.

use thiserror::Error;

use crate::payloads::{Event, EventId};

/// Publishing failure reported by an [`EventSink`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// The transport rejected the event.
    #[error("event delivery failed")]
    Rejected {
        /// Kind of the rejected event.
        event_kind: &'static str,
        /// Transport name.
        transport: String,
    },
    /// The transport is shut down.
    #[error("event transport closed")]
    Closed {
        /// Transport name.
        transport: String,
    },
}

/// Result alias for publishing.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Destination for domain events. Callers log failures and carry on.
pub trait EventSink: Send + Sync {
    /// Publish `event`, returning the identifier it was given.
    ///
    /// # Errors
    ///
    /// Returns an [`EventBusError`] when the transport cannot take the event.
    fn emit(&self, event: Event) -> EventBusResult<EventId>;
}
