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

//! Remediation decision engine.
//!
//! Layout: `strikes.rs`/`guard.rs`/`cache.rs` (time-windowed ledgers),
//! `blocklist/` (compiler and filename evaluator), `iterator.rs` (queue
//! paging), `rules/` (per-download decisions), `orchestrator.rs` (policy
//! runner), `policies/` (queue cleaner, content blocker, download cleaner),
//! `removal.rs` (removal channel and executor).

pub mod blocklist;
pub mod cache;
pub mod error;
pub mod guard;
pub mod ignore;
pub mod iterator;
pub mod orchestrator;
pub mod policies;
pub mod removal;
pub mod rules;
pub mod state;
pub mod strikes;

pub use blocklist::{BlocklistPattern, BlocklistProvider, CompiledBlocklist, evaluator::is_valid};
pub use error::{BlocklistError, EngineError, EngineResult};
pub use guard::RemovalGuard;
pub use ignore::IgnoredDownloads;
pub use iterator::{DEFAULT_PAGE_SIZE, QueueIterator, QueuePager, group_by_download_id};
pub use orchestrator::{Decision, Policy, PolicyRunner, RunContext, RunSummary};
pub use policies::{ContentBlocker, DownloadCleaner, QueueCleaner};
pub use removal::{
    DEFAULT_REMOVAL_CAPACITY, QueueItemRemover, RemovalReceiver, RemovalSender, removal_channel,
};
pub use state::EngineState;
pub use strikes::{ProgressTracker, StrikeLedger};
