//! Per-download decision rules shared by the policies.
//!
//! Rules are generic over the backend traits; policies decide which rules
//! apply and how their outcome becomes a [`crate::Decision`].

pub mod content;
pub mod failed_import;
pub mod queue;
pub mod seeding;

pub use content::ContentRules;
pub use failed_import::should_remove_from_queue;
pub use queue::QueueRules;
pub use seeding::{clean_reason, unlinked_status};
