//! Event payload types carried across the engine.

use chrono::{DateTime, Utc};

/// Identifier assigned to each event emitted by the engine.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Disqualifying condition recorded against a download.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrikeKind {
    /// Download made no progress while the client reported it as stalled.
    Stalled,
    /// Download never got past the metadata fetch phase.
    DownloadingMetadata,
    /// Queue provider reported that importing the download failed.
    FailedImport,
    /// Download speed stayed below the configured minimum.
    SlowSpeed,
    /// Estimated time to completion exceeded the configured maximum.
    SlowTime,
}

impl StrikeKind {
    /// Stable label used in logs, metrics, and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stalled => "stalled",
            Self::DownloadingMetadata => "downloading_metadata",
            Self::FailedImport => "failed_import",
            Self::SlowSpeed => "slow_speed",
            Self::SlowTime => "slow_time",
        }
    }
}

/// Why an item was removed from a queue provider.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    /// No removal reason applies.
    #[default]
    None,
    /// Download stalled for too many observations.
    Stalled,
    /// Download stayed below the minimum speed.
    SlowSpeed,
    /// Download exceeded the maximum estimated completion time.
    SlowTime,
    /// Queue provider could not import the download.
    FailedImport,
    /// Download never finished fetching metadata.
    DownloadingMetadata,
    /// Every file in the download was blocked by the blocklist.
    AllFilesBlocked,
    /// Every file in the download was already marked as skipped.
    AllFilesSkipped,
}

impl DeleteReason {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stalled => "stalled",
            Self::SlowSpeed => "slow_speed",
            Self::SlowTime => "slow_time",
            Self::FailedImport => "failed_import",
            Self::DownloadingMetadata => "downloading_metadata",
            Self::AllFilesBlocked => "all_files_blocked",
            Self::AllFilesSkipped => "all_files_skipped",
        }
    }
}

impl From<StrikeKind> for DeleteReason {
    fn from(kind: StrikeKind) -> Self {
        match kind {
            StrikeKind::Stalled => Self::Stalled,
            StrikeKind::DownloadingMetadata => Self::DownloadingMetadata,
            StrikeKind::FailedImport => Self::FailedImport,
            StrikeKind::SlowSpeed => Self::SlowSpeed,
            StrikeKind::SlowTime => Self::SlowTime,
        }
    }
}

/// Why a seeding download was removed from its client.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CleanReason {
    /// The category's ratio limit was reached after the minimum seed time.
    MaxRatioReached,
    /// The category's maximum seed time elapsed.
    MaxSeedTimeReached,
}

impl CleanReason {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxRatioReached => "max_ratio_reached",
            Self::MaxSeedTimeReached => "max_seed_time_reached",
        }
    }
}

/// Typed domain events surfaced across the system.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A strike was recorded against a download.
    StrikeIssued {
        /// Download identifier used by the download client.
        download_id: String,
        /// Display name of the download.
        title: String,
        /// Condition that triggered the strike.
        kind: StrikeKind,
        /// Strike count after this strike.
        count: u32,
        /// Configured strike limit.
        max_strikes: u32,
    },
    /// A queue item was handed to the removal executor.
    QueueItemRemovalRequested {
        /// Base URL of the queue provider instance.
        instance_url: String,
        /// Download identifier used by the download client.
        download_id: String,
        /// Display name of the queue item.
        title: String,
        /// Reason for the removal.
        reason: DeleteReason,
        /// Whether the download client should delete the data too.
        remove_from_client: bool,
    },
    /// A queue item was removed from its queue provider.
    QueueItemDeleted {
        /// Base URL of the queue provider instance.
        instance_url: String,
        /// Download identifier used by the download client.
        download_id: String,
        /// Display name of the queue item.
        title: String,
        /// Reason for the removal.
        reason: DeleteReason,
        /// Whether the download client deleted the data too.
        removed_from_client: bool,
    },
    /// Removing a queue item failed; the item is eligible again next pass.
    QueueItemDeleteFailed {
        /// Base URL of the queue provider instance.
        instance_url: String,
        /// Download identifier used by the download client.
        download_id: String,
        /// Human-readable failure detail.
        message: String,
    },
    /// A completed download was moved into the unlinked holding category.
    CategoryChanged {
        /// Download client name.
        client: String,
        /// Download hash.
        hash: String,
        /// Display name of the download.
        name: String,
        /// Category before the change.
        from: String,
        /// Category (or tag) applied.
        to: String,
        /// Whether `to` was applied as a tag instead of a category.
        is_tag: bool,
    },
    /// A seeding download was deleted from its client.
    DownloadCleaned {
        /// Download client name.
        client: String,
        /// Download hash.
        hash: String,
        /// Display name of the download.
        name: String,
        /// Category the cleaning rule came from.
        category: String,
        /// Rule that triggered the deletion.
        reason: CleanReason,
        /// Share ratio at deletion time.
        ratio: f64,
        /// Seeding time at deletion time, in seconds.
        seeding_seconds: u64,
    },
    /// A queue provider's blocklist was recompiled.
    BlocklistReloaded {
        /// Queue provider type the list belongs to.
        instance_type: String,
        /// Number of literal patterns published.
        patterns: usize,
        /// Number of regular expressions published.
        regexes: usize,
    },
    /// A policy run finished.
    PolicyRunCompleted {
        /// Policy name.
        policy: String,
        /// Removal requests emitted during the run.
        removals_requested: u64,
        /// Instances that failed and were skipped.
        failed_instances: u32,
    },
    /// A policy run aborted with a fatal error.
    PolicyRunFailed {
        /// Policy name.
        policy: String,
        /// Human-readable failure detail.
        message: String,
    },
}

impl Event {
    /// Machine-friendly discriminator for subscribers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StrikeIssued { .. } => "strike_issued",
            Self::QueueItemRemovalRequested { .. } => "queue_item_removal_requested",
            Self::QueueItemDeleted { .. } => "queue_item_deleted",
            Self::QueueItemDeleteFailed { .. } => "queue_item_delete_failed",
            Self::CategoryChanged { .. } => "category_changed",
            Self::DownloadCleaned { .. } => "download_cleaned",
            Self::BlocklistReloaded { .. } => "blocklist_reloaded",
            Self::PolicyRunCompleted { .. } => "policy_run_completed",
            Self::PolicyRunFailed { .. } => "policy_run_failed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier of the event.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_matches_serde_tag() {
        let event = Event::StrikeIssued {
            download_id: "abc".into(),
            title: "Show.S01E01".into(),
            kind: StrikeKind::SlowSpeed,
            count: 2,
            max_strikes: 3,
        };
        let value = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(value["type"], event.kind());
        assert_eq!(value["kind"], "slow_speed");
    }

    #[test]
    fn strike_kinds_map_to_delete_reasons() {
        assert_eq!(DeleteReason::from(StrikeKind::Stalled), DeleteReason::Stalled);
        assert_eq!(
            DeleteReason::from(StrikeKind::SlowTime).as_str(),
            "slow_time"
        );
        assert_eq!(DeleteReason::default(), DeleteReason::None);
    }
}
