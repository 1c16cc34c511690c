//! Hardlink census used to tell library-linked downloads from orphaned ones.
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

pub mod census;
pub mod error;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use census::{LinkCounter, LinkIdentity, LinkStat, platform_link_counter};
pub use error::{FsOpsError, FsOpsResult};
#[cfg(unix)]
pub use unix::UnixLinkCounter;
#[cfg(windows)]
pub use windows::WindowsLinkCounter;
