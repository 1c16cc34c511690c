//! At-most-once removal guard.
//!
//! A marker per (download id, instance URL) is the only record of a pending
//! removal. Markers expire on their own so a crashed executor cannot pin a
//! download forever.

use std::time::Duration;

use tracing::debug;

use crate::cache::{ExpiringCache, Expiry};

/// Lifetime of a removal marker when the executor never clears it.
pub const DEFAULT_MARKER_TTL: Duration = Duration::from_secs(60 * 60);

/// Tracks downloads with a removal in flight.
pub struct RemovalGuard {
    markers: ExpiringCache<(String, String), ()>,
}

impl Default for RemovalGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_TTL)
    }
}

impl RemovalGuard {
    /// Create a guard whose markers expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            markers: ExpiringCache::new(ttl, Expiry::Absolute),
        }
    }

    /// Mark a removal as pending; returns `false` when one already is.
    pub fn try_mark(&self, download_id: &str, instance_url: &str) -> bool {
        let marked = self
            .markers
            .insert_if_absent(key(download_id, instance_url), ());
        if !marked {
            debug!(download_id, instance = instance_url, "removal already pending");
        }
        marked
    }

    /// Release the marker after the removal completed or failed.
    pub fn clear(&self, download_id: &str, instance_url: &str) {
        self.markers.remove(&key(download_id, instance_url));
    }

    /// Whether a removal is pending.
    #[must_use]
    pub fn is_marked(&self, download_id: &str, instance_url: &str) -> bool {
        self.markers.contains(&key(download_id, instance_url))
    }
}

fn key(download_id: &str, instance_url: &str) -> (String, String) {
    (
        download_id.to_ascii_lowercase(),
        instance_url.trim_end_matches('/').to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_once_until_cleared() {
        let guard = RemovalGuard::default();
        assert!(guard.try_mark("ABC", "http://sonarr:8989"));
        assert!(!guard.try_mark("abc", "http://sonarr:8989/"));
        assert!(guard.is_marked("abc", "http://sonarr:8989"));
        assert!(guard.try_mark("abc", "http://other:8989"));

        guard.clear("abc", "http://sonarr:8989");
        assert!(!guard.is_marked("abc", "http://sonarr:8989"));
        assert!(guard.try_mark("abc", "http://sonarr:8989"));
    }

    #[tokio::test(start_paused = true)]
    async fn markers_expire_without_clear() {
        let guard = RemovalGuard::new(Duration::from_secs(5));
        assert!(guard.try_mark("abc", "http://radarr"));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(guard.try_mark("abc", "http://radarr"));
    }
}
