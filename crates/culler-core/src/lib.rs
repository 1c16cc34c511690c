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

//! Backend-agnostic queue and download client interfaces and DTOs.
//!
//! Layout: `model/` (queue records, download snapshots, decisions),
//! `service/` (provider and client traits), `error.rs` (backend errors).

pub mod error;
pub mod model;
pub mod service;

pub use error::{BackendError, BackendResult};
pub use model::{
    DecisionResult, DownloadFile, DownloadSnapshot, DownloadState, QueuePage, QueueRecord,
    RemovalRequest, SearchItem, SeedingDownload, StatusMessage, record_is_valid,
};
pub use service::{BackendRegistry, DownloadService, QueueProvider};
