//! Operator-supplied ignore list.
//!
//! Queue records are matched on their download id only. Seeding downloads
//! may additionally be matched on category, tag, or tracker domain.

use std::collections::HashSet;

use culler_core::SeedingDownload;
use url::Url;

/// Normalised set of ignored identifiers.
#[derive(Debug, Clone, Default)]
pub struct IgnoredDownloads {
    entries: HashSet<String>,
}

impl IgnoredDownloads {
    /// Build the set from raw configuration entries; blanks are dropped.
    #[must_use]
    pub fn new(entries: &[String]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|entry| entry.trim().to_lowercase())
                .filter(|entry| !entry.is_empty())
                .collect(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-insensitive download id match.
    #[must_use]
    pub fn contains_id(&self, download_id: &str) -> bool {
        !self.entries.is_empty() && self.entries.contains(&download_id.to_lowercase())
    }

    /// Whether a seeding download is ignored by hash, category, tag, or the
    /// domain of any of its trackers.
    #[must_use]
    pub fn matches_seeding(&self, download: &SeedingDownload) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if self.contains_id(&download.hash) {
            return true;
        }
        if download
            .category
            .as_deref()
            .is_some_and(|category| self.contains_id(category))
        {
            return true;
        }
        if download.tags.iter().any(|tag| self.contains_id(tag)) {
            return true;
        }
        download
            .trackers
            .iter()
            .filter_map(|tracker| tracker_host(tracker))
            .any(|host| {
                self.entries.iter().any(|entry| {
                    host == *entry
                        || host
                            .strip_suffix(entry.as_str())
                            .is_some_and(|prefix| prefix.ends_with('.'))
                })
            })
    }
}

fn tracker_host(tracker: &str) -> Option<String> {
    let parsed = Url::parse(tracker.trim()).ok()?;
    parsed.host_str().map(str::to_lowercase)
}
