#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Domain events of the Culler engine and the bus that carries them.
//!
//! Policies publish through the [`EventSink`] seam; the in-process
//! [`EventBus`] assigns sequential ids, broadcasts to live subscribers, and
//! keeps a bounded history for late readers.
//!
//! Layout: `payloads.rs` (event types and the reason enums they carry),
//! `routing.rs` (`EventBus`), `error.rs` (`EventBusError` and `EventSink`).

pub mod error;
pub mod payloads;
pub mod routing;

pub use error::{EventBusError, EventBusResult, EventSink};
pub use payloads::{
    CleanReason, DEFAULT_REPLAY_CAPACITY, DeleteReason, Event, EventEnvelope, EventId, StrikeKind,
};
pub use routing::{EventBus, EventStream};
