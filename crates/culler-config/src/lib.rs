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

//! Typed configuration snapshots for the remediation engine.
//!
//! Layout: `model.rs` (typed config sections), `defaults.rs` (default values
//! and limits), `validate.rs` (validation and schedule parsing), `loader.rs`
//! (JSON/YAML documents), `service.rs` (`ConfigService` + `ConfigSource`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, load_from_path, parse_document, render_document};
pub use model::{
    ArrConfig, ArrInstance, BlocklistMode, BlocklistSettings, CleanCategory, ConfigSnapshot,
    ContentBlockerConfig, DownloadClientConfig, DownloadClientKind, DownloadCleanerConfig,
    DownloadProtocol, FailedImportConfig, GeneralConfig, InstanceType, QueueCleanerConfig,
    Schedule, ScheduleUnit, SlowConfig, SonarrSearchType, StalledConfig,
};
pub use service::{ConfigService, ConfigSource, FileConfigSource, MemoryConfigSource};
pub use validate::validate_snapshot;
