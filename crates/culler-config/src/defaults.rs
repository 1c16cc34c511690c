//! Default values and hard limits for configuration records.
//!
//! # Design
//! - Centralize defaults so serde, validation, and callers agree.
//! - Keep time-based limits explicit for auditability.

use std::time::Duration;

/// Default timeout applied to backend HTTP calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 100;
/// Default delay between a queue removal and the replacement search, in seconds.
pub const DEFAULT_SEARCH_DELAY_SECS: u64 = 30;
/// Default settle delay between category changes and cleaning, in seconds.
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 10;
/// Default interval for the queue cleaner trigger, in minutes.
pub const DEFAULT_TRIGGER_EVERY_MINUTES: u32 = 5;

/// Longest interval accepted for a policy trigger.
pub const TRIGGER_MAX_LIMIT: Duration = Duration::from_secs(6 * 60 * 60);
/// Shortest interval accepted for a policy trigger.
pub const TRIGGER_MIN_LIMIT: Duration = Duration::from_secs(10);
/// Extra time strikes survive beyond the longest trigger interval.
pub const STRIKE_WINDOW_BUFFER: Duration = Duration::from_secs(2 * 60 * 60);

/// Highest strike count accepted for any strike rule.
pub const MAX_STRIKES_LIMIT: u32 = 5_000;

#[allow(clippy::redundant_pub_crate)]
pub(crate) const fn http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) const fn search_delay_secs() -> u64 {
    DEFAULT_SEARCH_DELAY_SECS
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) const fn settle_delay_secs() -> u64 {
    DEFAULT_SETTLE_DELAY_SECS
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) const fn enabled() -> bool {
    true
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) const fn disabled_limit() -> f64 {
    -1.0
}

#[allow(clippy::redundant_pub_crate)]
pub(crate) fn log_level() -> String {
    "info".to_string()
}
