//! The three remediation policies run by [`crate::PolicyRunner`].

pub mod content_blocker;
pub mod download_cleaner;
pub mod queue_cleaner;

pub use content_blocker::ContentBlocker;
pub use download_cleaner::DownloadCleaner;
pub use queue_cleaner::QueueCleaner;
