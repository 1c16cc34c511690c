//! Strike ledger and download progress tracking.
//!
//! # Design
//! - Strikes are keyed by (kind, download id) with a sliding window equal to
//!   the longest trigger interval plus a buffer, so a download that stops
//!   misbehaving is forgotten after a quiet window.
//! - Reaching the limit is terminal for the window: later strikes keep
//!   reporting `true` until the entry expires or is reset.
//! - Event publication is best effort.

use std::sync::Arc;
use std::time::Duration;

use culler_events::{Event, EventSink, StrikeKind};
use culler_telemetry::Metrics;
use tracing::{info, warn};

use crate::cache::{ExpiringCache, Expiry};

/// Time-windowed strike counters.
pub struct StrikeLedger {
    entries: ExpiringCache<(StrikeKind, String), u32>,
    events: Arc<dyn EventSink>,
    metrics: Metrics,
}

impl StrikeLedger {
    /// Create a ledger whose entries live for `window` after their last strike.
    #[must_use]
    pub fn new(window: Duration, events: Arc<dyn EventSink>, metrics: Metrics) -> Self {
        Self {
            entries: ExpiringCache::new(window, Expiry::Sliding),
            events,
            metrics,
        }
    }

    /// Adjust the sliding window, typically after a configuration change.
    pub fn set_window(&self, window: Duration) {
        self.entries.set_ttl(window);
    }

    /// Record a strike and report whether `max_strikes` has been reached.
    ///
    /// A `max_strikes` of zero disables the rule: nothing is recorded and the
    /// answer is always `false`.
    pub fn strike_and_check_limit(
        &self,
        download_id: &str,
        display_name: &str,
        max_strikes: u32,
        kind: StrikeKind,
    ) -> bool {
        if max_strikes == 0 {
            return false;
        }

        let count = self
            .entries
            .update(key(kind, download_id), |previous| {
                previous.unwrap_or(0).saturating_add(1)
            });
        self.metrics.inc_strike(kind.as_str());

        if let Err(err) = self.events.emit(Event::StrikeIssued {
            download_id: download_id.to_string(),
            title: display_name.to_string(),
            kind,
            count,
            max_strikes,
        }) {
            warn!(error = %err, download_id, "failed to publish strike event");
        }

        if count > max_strikes {
            warn!(
                download_id,
                title = display_name,
                kind = kind.as_str(),
                count,
                max_strikes,
                "download keeps reappearing after reaching its strike limit"
            );
        } else {
            info!(
                download_id,
                title = display_name,
                kind = kind.as_str(),
                count,
                max_strikes,
                "strike recorded"
            );
        }

        count >= max_strikes
    }

    /// Forget the strikes recorded for `download_id` under `kind`.
    pub fn reset(&self, download_id: &str, kind: StrikeKind) {
        if self.entries.remove(&key(kind, download_id)).is_some() {
            info!(download_id, kind = kind.as_str(), "strikes reset");
        }
    }

    /// Current strike count.
    #[must_use]
    pub fn count(&self, download_id: &str, kind: StrikeKind) -> u32 {
        self.entries.get(&key(kind, download_id)).unwrap_or(0)
    }
}

/// Remembers the last observed downloaded byte count per download.
pub struct ProgressTracker {
    observed: ExpiringCache<String, u64>,
}

impl ProgressTracker {
    /// Create a tracker whose observations live for `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            observed: ExpiringCache::new(window, Expiry::Sliding),
        }
    }

    /// Adjust the observation lifetime.
    pub fn set_window(&self, window: Duration) {
        self.observed.set_ttl(window);
    }

    /// Record `downloaded_bytes` and report whether it grew since the last
    /// observation. The first observation never counts as progress.
    pub fn has_progressed(&self, download_id: &str, downloaded_bytes: u64) -> bool {
        let mut previous = None;
        self.observed
            .update(download_id.to_ascii_lowercase(), |last| {
                previous = last;
                downloaded_bytes
            });
        previous.is_some_and(|last| downloaded_bytes > last)
    }
}

fn key(kind: StrikeKind, download_id: &str) -> (StrikeKind, String) {
    (kind, download_id.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use culler_events::EventBus;

    fn ledger() -> (StrikeLedger, EventBus) {
        let bus = EventBus::with_capacity(32);
        let metrics = Metrics::new().unwrap_or_else(|err| panic!("metrics: {err}"));
        let ledger = StrikeLedger::new(Duration::from_secs(3_600), Arc::new(bus.clone()), metrics);
        (ledger, bus)
    }

    #[tokio::test]
    async fn limit_is_reached_on_the_last_strike() {
        let (ledger, bus) = ledger();
        for _ in 0..2 {
            assert!(!ledger.strike_and_check_limit("ABC", "Show", 3, StrikeKind::Stalled));
        }
        assert!(ledger.strike_and_check_limit("abc", "Show", 3, StrikeKind::Stalled));
        assert!(ledger.strike_and_check_limit("abc", "Show", 3, StrikeKind::Stalled));
        assert_eq!(ledger.count("abc", StrikeKind::Stalled), 4);
        assert_eq!(ledger.count("abc", StrikeKind::SlowSpeed), 0);

        let backlog = bus.backlog_since(0);
        assert_eq!(backlog.len(), 4);
        assert!(matches!(
            backlog.last().map(|envelope| &envelope.event),
            Some(Event::StrikeIssued { count: 4, max_strikes: 3, .. })
        ));
    }

    #[tokio::test]
    async fn zero_limit_disables_the_rule() {
        let (ledger, bus) = ledger();
        for _ in 0..10 {
            assert!(!ledger.strike_and_check_limit("abc", "Show", 0, StrikeKind::FailedImport));
        }
        assert_eq!(ledger.count("abc", StrikeKind::FailedImport), 0);
        assert!(bus.last_event_id().is_none());
    }

    #[tokio::test]
    async fn reset_clears_only_one_kind() {
        let (ledger, _bus) = ledger();
        ledger.strike_and_check_limit("abc", "Show", 5, StrikeKind::SlowSpeed);
        ledger.strike_and_check_limit("abc", "Show", 5, StrikeKind::Stalled);
        ledger.reset("ABC", StrikeKind::SlowSpeed);
        assert_eq!(ledger.count("abc", StrikeKind::SlowSpeed), 0);
        assert_eq!(ledger.count("abc", StrikeKind::Stalled), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn strikes_expire_after_quiet_window() {
        let (ledger, _bus) = ledger();
        ledger.set_window(Duration::from_secs(60));
        ledger.strike_and_check_limit("abc", "Show", 2, StrikeKind::Stalled);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!ledger.strike_and_check_limit("abc", "Show", 2, StrikeKind::Stalled));
    }

    #[tokio::test]
    async fn progress_requires_growth_after_first_observation() {
        let tracker = ProgressTracker::new(Duration::from_secs(60));
        assert!(!tracker.has_progressed("abc", 100));
        assert!(!tracker.has_progressed("abc", 100));
        assert!(tracker.has_progressed("ABC", 150));
        assert!(!tracker.has_progressed("abc", 120));
    }
}
