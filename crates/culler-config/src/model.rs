//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; IO lives in `loader.rs` and `service.rs`.
//! - One struct per configuration section so a snapshot can be read atomically.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;

/// Queue provider flavours the engine knows how to clean.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum InstanceType {
    /// TV series manager.
    Sonarr,
    /// Movie manager.
    Radarr,
    /// Music manager.
    Lidarr,
}

impl InstanceType {
    /// Every supported queue provider type, in processing order.
    pub const ALL: [Self; 3] = [Self::Sonarr, Self::Radarr, Self::Lidarr];

    /// Lowercase identifier used in logs, metrics, and cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
            Self::Lidarr => "lidarr",
        }
    }
}

impl Display for InstanceType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for InstanceType {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sonarr" => Ok(Self::Sonarr),
            "radarr" => Ok(Self::Radarr),
            "lidarr" => Ok(Self::Lidarr),
            _ => Err(ConfigError::InvalidField {
                section: "arr".to_string(),
                field: "instance_type".to_string(),
                value: Some(value.to_string()),
                reason: "unknown_instance_type",
            }),
        }
    }
}

/// Transfer protocol of a queued download.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownloadProtocol {
    /// `BitTorrent` transfer.
    Torrent,
    /// Usenet transfer.
    Usenet,
    /// Protocol reported by the queue provider was not recognised.
    #[default]
    #[serde(other)]
    Unknown,
}

/// One queue provider instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArrInstance {
    /// Operator-facing name, unique per instance type.
    pub name: String,
    /// Base URL of the instance API.
    pub url: String,
    /// API key used by the HTTP client.
    #[serde(default)]
    pub api_key: String,
    /// Whether the instance takes part in policy runs.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

/// How Sonarr replacement searches are scoped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SonarrSearchType {
    /// Search the removed episodes only.
    #[default]
    Episode,
    /// Search the whole season of the removed episodes.
    Season,
    /// Search the whole series.
    Series,
}

/// Instances configured for one queue provider type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArrConfig {
    /// Configured instances.
    #[serde(default)]
    pub instances: Vec<ArrInstance>,
    /// Search scope; only meaningful for Sonarr.
    #[serde(default)]
    pub search_type: SonarrSearchType,
}

impl ArrConfig {
    /// Instances that take part in policy runs.
    pub fn enabled_instances(&self) -> impl Iterator<Item = &ArrInstance> {
        self.instances.iter().filter(|instance| instance.enabled)
    }
}

/// Download client implementations the engine can be wired to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DownloadClientKind {
    /// qBittorrent Web API.
    QBittorrent,
    /// Deluge JSON-RPC.
    Deluge,
    /// Transmission RPC.
    Transmission,
    /// `SABnzbd` API.
    Sabnzbd,
    /// `NZBGet` API.
    NzbGet,
}

impl DownloadClientKind {
    /// Protocol the client transfers.
    #[must_use]
    pub const fn protocol(self) -> DownloadProtocol {
        match self {
            Self::QBittorrent | Self::Deluge | Self::Transmission => DownloadProtocol::Torrent,
            Self::Sabnzbd | Self::NzbGet => DownloadProtocol::Usenet,
        }
    }

    /// Lowercase identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QBittorrent => "qbittorrent",
            Self::Deluge => "deluge",
            Self::Transmission => "transmission",
            Self::Sabnzbd => "sabnzbd",
            Self::NzbGet => "nzbget",
        }
    }
}

/// Connection settings for a download client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadClientConfig {
    /// Operator-facing name, unique across clients.
    pub name: String,
    /// Client implementation.
    pub kind: DownloadClientKind,
    /// Base URL of the client API.
    pub host: String,
    /// Optional path prefix when the client sits behind a reverse proxy.
    #[serde(default)]
    pub url_base: Option<String>,
    /// Login user name.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password.
    #[serde(default)]
    pub password: Option<String>,
    /// Whether the client takes part in policy runs.
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

/// Unit of an interval schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleUnit {
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
}

/// When an external trigger should invoke a policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schedule {
    /// Fixed interval.
    Interval {
        /// Number of units between runs.
        every: u32,
        /// Unit of `every`.
        unit: ScheduleUnit,
    },
    /// Quartz-style cron expression (seconds field first).
    Cron {
        /// Expression text.
        expression: String,
    },
}

impl Default for Schedule {
    fn default() -> Self {
        Self::Interval {
            every: defaults::DEFAULT_TRIGGER_EVERY_MINUTES,
            unit: ScheduleUnit::Minutes,
        }
    }
}

impl Schedule {
    /// Interval between runs; cron schedules report the longest accepted interval.
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        match self {
            Self::Interval { every, unit } => {
                let every = u64::from(*every);
                match unit {
                    ScheduleUnit::Seconds => Duration::from_secs(every),
                    ScheduleUnit::Minutes => Duration::from_secs(every * 60),
                    ScheduleUnit::Hours => Duration::from_secs(every * 3_600),
                }
            }
            Self::Cron { .. } => defaults::TRIGGER_MAX_LIMIT,
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralConfig {
    /// Log and skip every state-mutating side effect.
    #[serde(default)]
    pub dry_run: bool,
    /// Timeout for backend HTTP calls and remote blocklist fetches.
    #[serde(default = "defaults::http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Download ids, hashes, categories, tags, or tracker domains to leave alone.
    #[serde(default)]
    pub ignored_downloads: Vec<String>,
    /// Trigger a replacement search after removing a queue item.
    #[serde(default = "defaults::enabled")]
    pub search_enabled: bool,
    /// Delay before the replacement search, in seconds.
    #[serde(default = "defaults::search_delay_secs")]
    pub search_delay_secs: u64,
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Log output format (`pretty` or `json`).
    #[serde(default)]
    pub log_format: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            http_timeout_secs: defaults::DEFAULT_HTTP_TIMEOUT_SECS,
            ignored_downloads: Vec::new(),
            search_enabled: true,
            search_delay_secs: defaults::DEFAULT_SEARCH_DELAY_SECS,
            log_level: defaults::log_level(),
            log_format: None,
        }
    }
}

impl GeneralConfig {
    /// Backend HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Delay before replacement searches.
    #[must_use]
    pub const fn search_delay(&self) -> Duration {
        Duration::from_secs(self.search_delay_secs)
    }
}

/// Failed-import strike rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FailedImportConfig {
    /// Strikes before removal; `0` disables the rule.
    #[serde(default)]
    pub max_strikes: u32,
    /// Leave private-tracker downloads alone.
    #[serde(default)]
    pub ignore_private: bool,
    /// Delete private-tracker data from the client on removal.
    #[serde(default)]
    pub delete_private: bool,
    /// Status message fragments that exempt a record from striking.
    #[serde(default)]
    pub ignored_patterns: Vec<String>,
}

/// Stalled and metadata-stuck strike rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StalledConfig {
    /// Strikes before removal; `0` disables the rule.
    #[serde(default)]
    pub max_strikes: u32,
    /// Clear stalled strikes when downloaded bytes grow.
    #[serde(default)]
    pub reset_strikes_on_progress: bool,
    /// Leave private-tracker downloads alone.
    #[serde(default)]
    pub ignore_private: bool,
    /// Delete private-tracker data from the client on removal.
    #[serde(default)]
    pub delete_private: bool,
    /// Strikes before removing a download stuck fetching metadata; `0` disables.
    #[serde(default)]
    pub downloading_metadata_max_strikes: u32,
}

/// Slow download strike rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SlowConfig {
    /// Strikes before removal; `0` disables the rule.
    #[serde(default)]
    pub max_strikes: u32,
    /// Clear slow strikes when downloaded bytes grow.
    #[serde(default)]
    pub reset_strikes_on_progress: bool,
    /// Leave private-tracker downloads alone.
    #[serde(default)]
    pub ignore_private: bool,
    /// Delete private-tracker data from the client on removal.
    #[serde(default)]
    pub delete_private: bool,
    /// Minimum acceptable speed in bytes per second; `0` disables the speed check.
    #[serde(default)]
    pub min_speed_bps: u64,
    /// Maximum acceptable ETA in hours; `0` disables the time check.
    #[serde(default)]
    pub max_time_hours: f64,
    /// Downloads larger than this are never struck as slow.
    #[serde(default)]
    pub ignore_above_size_bytes: Option<u64>,
}

/// Queue cleaner policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueueCleanerConfig {
    /// Whether the policy runs.
    #[serde(default)]
    pub enabled: bool,
    /// Trigger schedule.
    #[serde(default)]
    pub schedule: Schedule,
    /// Failed-import rule.
    #[serde(default)]
    pub failed_import: FailedImportConfig,
    /// Stalled and metadata rules.
    #[serde(default)]
    pub stalled: StalledConfig,
    /// Slow download rules.
    #[serde(default)]
    pub slow: SlowConfig,
}

/// Blacklist or whitelist semantics of a blocklist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlocklistMode {
    /// Matching files are unwanted.
    #[default]
    Blacklist,
    /// Only matching files are wanted.
    Whitelist,
}

impl BlocklistMode {
    /// Lowercase identifier used in fingerprints and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blacklist => "blacklist",
            Self::Whitelist => "whitelist",
        }
    }
}

/// Blocklist source for one queue provider type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BlocklistSettings {
    /// Whether the list is applied.
    #[serde(default)]
    pub enabled: bool,
    /// Local file path or `http(s)://` URL.
    #[serde(default)]
    pub path: Option<String>,
    /// List semantics.
    #[serde(default)]
    pub mode: BlocklistMode,
}

/// Content blocker policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContentBlockerConfig {
    /// Whether the policy runs.
    #[serde(default)]
    pub enabled: bool,
    /// Trigger schedule.
    #[serde(default)]
    pub schedule: Schedule,
    /// Leave private-tracker downloads alone.
    #[serde(default)]
    pub ignore_private: bool,
    /// Delete private-tracker data from the client on removal.
    #[serde(default)]
    pub delete_private: bool,
    /// Sonarr blocklist.
    #[serde(default)]
    pub sonarr: BlocklistSettings,
    /// Radarr blocklist.
    #[serde(default)]
    pub radarr: BlocklistSettings,
    /// Lidarr blocklist.
    #[serde(default)]
    pub lidarr: BlocklistSettings,
}

impl ContentBlockerConfig {
    /// Blocklist configured for a queue provider type.
    #[must_use]
    pub const fn blocklist(&self, instance_type: InstanceType) -> &BlocklistSettings {
        match instance_type {
            InstanceType::Sonarr => &self.sonarr,
            InstanceType::Radarr => &self.radarr,
            InstanceType::Lidarr => &self.lidarr,
        }
    }
}

/// Seeding limits applied to one download client category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanCategory {
    /// Category name as known by the download clients.
    pub name: String,
    /// Ratio limit; negative disables.
    #[serde(default = "defaults::disabled_limit")]
    pub max_ratio: f64,
    /// Minimum seed time before the ratio limit applies, in hours.
    #[serde(default)]
    pub min_seed_time_hours: f64,
    /// Seed time limit in hours; negative disables.
    #[serde(default = "defaults::disabled_limit")]
    pub max_seed_time_hours: f64,
}

/// Download cleaner policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DownloadCleanerConfig {
    /// Whether the policy runs.
    #[serde(default)]
    pub enabled: bool,
    /// Trigger schedule.
    #[serde(default)]
    pub schedule: Schedule,
    /// Categories with seeding limits.
    #[serde(default)]
    pub categories: Vec<CleanCategory>,
    /// Allow deleting private-tracker downloads.
    #[serde(default)]
    pub delete_private: bool,
    /// Holding category for downloads without library hardlinks.
    #[serde(default)]
    pub unlinked_target_category: Option<String>,
    /// Apply the holding category as a tag instead of a category.
    #[serde(default)]
    pub unlinked_use_tag: bool,
    /// Directory whose hardlinks do not count as library links.
    #[serde(default)]
    pub unlinked_ignored_root_dir: Option<String>,
    /// Categories scanned for unlinked downloads.
    #[serde(default)]
    pub unlinked_categories: Vec<String>,
    /// Delay between category changes and cleaning, in seconds.
    #[serde(default = "defaults::settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl DownloadCleanerConfig {
    /// Whether unlinked downloads should be reclassified.
    #[must_use]
    pub fn unlinked_enabled(&self) -> bool {
        self.unlinked_target_category
            .as_deref()
            .is_some_and(|category| !category.trim().is_empty())
            && !self.unlinked_categories.is_empty()
    }

    /// Whether any seeding limits are configured.
    #[must_use]
    pub fn cleaning_enabled(&self) -> bool {
        !self.categories.is_empty()
    }

    /// Settle delay between reclassification and cleaning.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }
}

/// Point-in-time view of every configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigSnapshot {
    /// Monotonic revision assigned by the configuration service.
    #[serde(default)]
    pub revision: u64,
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Sonarr instances.
    #[serde(default)]
    pub sonarr: ArrConfig,
    /// Radarr instances.
    #[serde(default)]
    pub radarr: ArrConfig,
    /// Lidarr instances.
    #[serde(default)]
    pub lidarr: ArrConfig,
    /// Download clients.
    #[serde(default)]
    pub download_clients: Vec<DownloadClientConfig>,
    /// Queue cleaner policy.
    #[serde(default)]
    pub queue_cleaner: QueueCleanerConfig,
    /// Content blocker policy.
    #[serde(default)]
    pub content_blocker: ContentBlockerConfig,
    /// Download cleaner policy.
    #[serde(default)]
    pub download_cleaner: DownloadCleanerConfig,
}

impl ConfigSnapshot {
    /// Instances configured for a queue provider type.
    #[must_use]
    pub const fn arr(&self, instance_type: InstanceType) -> &ArrConfig {
        match instance_type {
            InstanceType::Sonarr => &self.sonarr,
            InstanceType::Radarr => &self.radarr,
            InstanceType::Lidarr => &self.lidarr,
        }
    }

    /// Download clients that take part in policy runs.
    pub fn enabled_download_clients(&self) -> impl Iterator<Item = &DownloadClientConfig> {
        self.download_clients.iter().filter(|client| client.enabled)
    }

    /// Lifetime of strike and progress entries: the longest enabled trigger
    /// interval plus [`defaults::STRIKE_WINDOW_BUFFER`].
    #[must_use]
    pub fn strike_window(&self) -> Duration {
        let longest = [
            (self.queue_cleaner.enabled, &self.queue_cleaner.schedule),
            (self.content_blocker.enabled, &self.content_blocker.schedule),
            (self.download_cleaner.enabled, &self.download_cleaner.schedule),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, schedule)| schedule.max_interval())
        .max()
        .unwrap_or(defaults::TRIGGER_MAX_LIMIT);
        longest + defaults::STRIKE_WINDOW_BUFFER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strike_window_tracks_longest_enabled_schedule() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.queue_cleaner.enabled = true;
        snapshot.queue_cleaner.schedule = Schedule::Interval {
            every: 30,
            unit: ScheduleUnit::Minutes,
        };
        snapshot.download_cleaner.schedule = Schedule::Interval {
            every: 5,
            unit: ScheduleUnit::Hours,
        };
        assert_eq!(
            snapshot.strike_window(),
            Duration::from_secs(30 * 60) + defaults::STRIKE_WINDOW_BUFFER
        );

        snapshot.content_blocker.enabled = true;
        snapshot.content_blocker.schedule = Schedule::Cron {
            expression: "0 0 * * * ?".into(),
        };
        assert_eq!(
            snapshot.strike_window(),
            defaults::TRIGGER_MAX_LIMIT + defaults::STRIKE_WINDOW_BUFFER
        );
    }

    #[test]
    fn instance_type_parses_case_insensitively() {
        assert_eq!("Sonarr".parse::<InstanceType>().ok(), Some(InstanceType::Sonarr));
        assert!("readarr".parse::<InstanceType>().is_err());
        assert_eq!(InstanceType::Lidarr.to_string(), "lidarr");
    }

    #[test]
    fn unlinked_requires_target_and_sources() {
        let mut config = DownloadCleanerConfig {
            unlinked_target_category: Some("cleanup".into()),
            ..DownloadCleanerConfig::default()
        };
        assert!(!config.unlinked_enabled());
        config.unlinked_categories.push("tv-sonarr".into());
        assert!(config.unlinked_enabled());
        config.unlinked_target_category = Some("  ".into());
        assert!(!config.unlinked_enabled());
    }

    #[test]
    fn client_kinds_report_protocol() {
        assert_eq!(
            DownloadClientKind::Deluge.protocol(),
            DownloadProtocol::Torrent
        );
        assert_eq!(
            DownloadClientKind::Sabnzbd.protocol(),
            DownloadProtocol::Usenet
        );
    }
}
