//! Queue, download, and decision types shared across the workspace.

use culler_config::{ArrInstance, DownloadProtocol, InstanceType, SonarrSearchType};
use culler_events::DeleteReason;
use serde::{Deserialize, Serialize};

/// Status message attached to a queue record by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatusMessage {
    /// Message heading (usually the release title).
    #[serde(default)]
    pub title: String,
    /// Individual message lines.
    #[serde(default)]
    pub messages: Vec<String>,
}

/// One item in a queue provider's download queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct QueueRecord {
    /// Stable record identifier inside the provider.
    pub id: i64,
    /// Download client hash or identifier.
    pub download_id: String,
    /// Release title.
    pub title: String,
    /// Transfer protocol.
    pub protocol: DownloadProtocol,
    /// Owning series (Sonarr).
    pub series_id: i64,
    /// Owning episode (Sonarr).
    pub episode_id: i64,
    /// Season of the owning episode (Sonarr).
    pub season_number: i64,
    /// Owning movie (Radarr).
    pub movie_id: i64,
    /// Owning artist (Lidarr).
    pub artist_id: i64,
    /// Owning album (Lidarr).
    pub album_id: i64,
    /// Provider status (`downloading`, `completed`, ...).
    pub status: String,
    /// Tracked download status (`ok`, `warning`, `error`).
    pub tracked_download_status: String,
    /// Tracked download state (`downloading`, `importPending`, ...).
    pub tracked_download_state: String,
    /// Messages explaining the current status.
    pub status_messages: Vec<StatusMessage>,
    /// Name of the download client handling the record.
    pub download_client: Option<String>,
    /// Total size in bytes.
    pub size: u64,
    /// Remaining bytes.
    pub size_left: u64,
}

impl QueueRecord {
    /// Every status message line, flattened.
    pub fn message_lines(&self) -> impl Iterator<Item = &str> {
        self.status_messages
            .iter()
            .flat_map(|message| message.messages.iter().map(String::as_str))
    }
}

/// Whether a record carries the identifiers needed to act on it.
///
/// Records without a download id, or missing the owning entity ids for their
/// provider type, are skipped rather than acted upon.
#[must_use]
pub fn record_is_valid(instance_type: InstanceType, record: &QueueRecord) -> bool {
    if record.download_id.trim().is_empty() {
        return false;
    }
    match instance_type {
        InstanceType::Sonarr => record.series_id != 0 && record.episode_id != 0,
        InstanceType::Radarr => record.movie_id != 0,
        InstanceType::Lidarr => record.artist_id != 0 && record.album_id != 0,
    }
}

/// One page of a provider's queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueuePage {
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Total records in the queue across all pages.
    pub total_records: u64,
    /// Records on this page.
    pub records: Vec<QueueRecord>,
}

/// Outcome of asking a download client about a queue record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DecisionResult {
    /// The client knows the download.
    pub found: bool,
    /// The record should be removed from the provider queue.
    pub should_remove: bool,
    /// Why removal was requested.
    pub delete_reason: DeleteReason,
    /// The download belongs to a private tracker.
    pub is_private: bool,
}

impl DecisionResult {
    /// The client does not know the download.
    #[must_use]
    pub const fn not_found() -> Self {
        Self {
            found: false,
            should_remove: false,
            delete_reason: DeleteReason::None,
            is_private: false,
        }
    }

    /// The download was found and should stay.
    #[must_use]
    pub const fn keep(is_private: bool) -> Self {
        Self {
            found: true,
            should_remove: false,
            delete_reason: DeleteReason::None,
            is_private,
        }
    }

    /// The download was found and should be removed.
    #[must_use]
    pub const fn remove(reason: DeleteReason, is_private: bool) -> Self {
        Self {
            found: true,
            should_remove: true,
            delete_reason: reason,
            is_private,
        }
    }
}

/// Replacement search target sent to a provider after a removal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchItem {
    /// Single episode.
    Episode {
        /// Episode identifier.
        episode_id: i64,
    },
    /// Whole season of a series.
    Season {
        /// Series identifier.
        series_id: i64,
        /// Season number.
        season_number: i64,
    },
    /// Whole series.
    Series {
        /// Series identifier.
        series_id: i64,
    },
    /// Single movie.
    Movie {
        /// Movie identifier.
        movie_id: i64,
    },
    /// Single album.
    Album {
        /// Album identifier.
        album_id: i64,
    },
}

impl SearchItem {
    /// Build the de-duplicated search targets for the records of one download.
    ///
    /// Packs searched in episode mode fall back to a season search since the
    /// download covered more than the individual episodes.
    #[must_use]
    pub fn from_records(
        instance_type: InstanceType,
        search_type: SonarrSearchType,
        records: &[QueueRecord],
        is_pack: bool,
    ) -> Vec<Self> {
        let mut items: Vec<Self> = Vec::with_capacity(records.len());
        for record in records {
            let item = match instance_type {
                InstanceType::Sonarr => match search_type {
                    SonarrSearchType::Episode if !is_pack => Self::Episode {
                        episode_id: record.episode_id,
                    },
                    SonarrSearchType::Episode | SonarrSearchType::Season => Self::Season {
                        series_id: record.series_id,
                        season_number: record.season_number,
                    },
                    SonarrSearchType::Series => Self::Series {
                        series_id: record.series_id,
                    },
                },
                InstanceType::Radarr => Self::Movie {
                    movie_id: record.movie_id,
                },
                InstanceType::Lidarr => Self::Album {
                    album_id: record.album_id,
                },
            };
            if !items.contains(&item) {
                items.push(item);
            }
        }
        items
    }
}

/// Client-reported state of an in-flight download.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Actively transferring.
    Downloading,
    /// No peers or no progress.
    Stalled,
    /// Waiting for torrent metadata.
    DownloadingMetadata,
    /// Complete and seeding.
    Seeding,
    /// Paused by the user or client.
    Paused,
    /// Waiting in the client queue.
    Queued,
    /// Verifying data.
    Checking,
    /// Client reported an error.
    Error,
    /// State not mapped.
    #[default]
    Unknown,
}

/// One file inside a download.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DownloadFile {
    /// Client-side file index.
    pub index: usize,
    /// Relative file path as reported by the client.
    pub name: String,
    /// File is excluded from the download.
    #[serde(default)]
    pub skipped: bool,
}

/// Client-side view of one download, as used by the queue rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DownloadSnapshot {
    /// Info hash or client id.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Transfer state.
    pub state: DownloadState,
    /// Download belongs to a private tracker.
    #[serde(default)]
    pub is_private: bool,
    /// Bytes downloaded so far.
    #[serde(default)]
    pub downloaded_bytes: u64,
    /// Total bytes selected for download.
    #[serde(default)]
    pub total_size: u64,
    /// Current download speed in bytes per second.
    #[serde(default)]
    pub download_speed_bps: u64,
    /// Estimated seconds to completion when the client knows it.
    #[serde(default)]
    pub eta_secs: Option<u64>,
    /// Files in the download.
    #[serde(default)]
    pub files: Vec<DownloadFile>,
}

/// Completed download considered by the download cleaner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SeedingDownload {
    /// Info hash or client id.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Client category.
    #[serde(default)]
    pub category: Option<String>,
    /// Client tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tracker announce URLs.
    #[serde(default)]
    pub trackers: Vec<String>,
    /// Download belongs to a private tracker.
    #[serde(default)]
    pub is_private: bool,
    /// Upload/download ratio.
    #[serde(default)]
    pub ratio: f64,
    /// Seconds spent seeding.
    #[serde(default)]
    pub seeding_time_secs: u64,
    /// Directory holding the downloaded data.
    #[serde(default)]
    pub save_path: String,
    /// Files in the download.
    #[serde(default)]
    pub files: Vec<DownloadFile>,
}

impl SeedingDownload {
    /// Seeding time in hours.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn seeding_hours(&self) -> f64 {
        self.seeding_time_secs as f64 / 3_600.0
    }
}

/// Queue item removal handed to the removal executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    /// Instance owning the queue item.
    pub instance: ArrInstance,
    /// Provider type of the instance.
    pub instance_type: InstanceType,
    /// First record of the download group.
    pub record: QueueRecord,
    /// Replacement searches to trigger after removal.
    pub search_items: Vec<SearchItem>,
    /// Also delete the download from the client.
    pub remove_from_client: bool,
    /// Why the item is removed.
    pub reason: DeleteReason,
    /// The download covered several queue records.
    pub is_pack: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(series_id: i64, season_number: i64, episode_id: i64) -> QueueRecord {
        QueueRecord {
            download_id: "HASH".into(),
            series_id,
            season_number,
            episode_id,
            ..QueueRecord::default()
        }
    }

    #[test]
    fn record_validity_depends_on_provider() {
        let record = episode(1, 1, 0);
        assert!(!record_is_valid(InstanceType::Sonarr, &record));
        assert!(record_is_valid(InstanceType::Sonarr, &episode(1, 1, 2)));

        let movie = QueueRecord {
            download_id: "abc".into(),
            movie_id: 7,
            ..QueueRecord::default()
        };
        assert!(record_is_valid(InstanceType::Radarr, &movie));
        assert!(!record_is_valid(InstanceType::Lidarr, &movie));

        let blank = QueueRecord {
            movie_id: 7,
            ..QueueRecord::default()
        };
        assert!(!record_is_valid(InstanceType::Radarr, &blank));
    }

    #[test]
    fn sonarr_search_items_follow_search_type() {
        let records = vec![episode(10, 2, 100), episode(10, 2, 101)];

        let items = SearchItem::from_records(
            InstanceType::Sonarr,
            SonarrSearchType::Episode,
            &records,
            false,
        );
        assert_eq!(
            items,
            vec![
                SearchItem::Episode { episode_id: 100 },
                SearchItem::Episode { episode_id: 101 }
            ]
        );

        let pack = SearchItem::from_records(
            InstanceType::Sonarr,
            SonarrSearchType::Episode,
            &records,
            true,
        );
        assert_eq!(
            pack,
            vec![SearchItem::Season {
                series_id: 10,
                season_number: 2
            }]
        );

        let series = SearchItem::from_records(
            InstanceType::Sonarr,
            SonarrSearchType::Series,
            &records,
            false,
        );
        assert_eq!(series, vec![SearchItem::Series { series_id: 10 }]);
    }

    #[test]
    fn decision_constructors_set_flags() {
        assert!(!DecisionResult::not_found().found);
        let keep = DecisionResult::keep(true);
        assert!(keep.found && !keep.should_remove && keep.is_private);
        let remove = DecisionResult::remove(DeleteReason::Stalled, false);
        assert!(remove.should_remove);
        assert_eq!(remove.delete_reason, DeleteReason::Stalled);
    }

    #[test]
    fn queue_record_deserializes_with_defaults() -> anyhow::Result<()> {
        let record: QueueRecord = serde_json::from_str(
            r#"{"id": 3, "download_id": "abc", "protocol": "torrent",
                "status_messages": [{"title": "x", "messages": ["one", "two"]}]}"#,
        )?;
        assert_eq!(record.protocol, DownloadProtocol::Torrent);
        assert_eq!(record.message_lines().collect::<Vec<_>>(), vec!["one", "two"]);
        Ok(())
    }
}
