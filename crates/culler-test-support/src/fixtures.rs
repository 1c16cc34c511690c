//! Configuration and queue record builders that pass validation.

use culler_config::{
    ArrInstance, ConfigSnapshot, DownloadClientConfig, DownloadClientKind, DownloadProtocol,
};
use culler_core::{DownloadSnapshot, DownloadState, QueueRecord, SeedingDownload};

/// URL of the Sonarr instance used by [`snapshot_with_sonarr`].
pub const SONARR_URL: &str = "http://sonarr.test:8989";
/// Name of the torrent client used by [`snapshot_with_sonarr`].
pub const TORRENT_CLIENT: &str = "qbit";

/// Enabled Sonarr instance.
#[must_use]
pub fn sonarr_instance() -> ArrInstance {
    ArrInstance {
        name: "sonarr-main".into(),
        url: SONARR_URL.into(),
        api_key: "test-key".into(),
        enabled: true,
    }
}

/// Enabled download client of `kind`.
#[must_use]
pub fn download_client(name: &str, kind: DownloadClientKind) -> DownloadClientConfig {
    DownloadClientConfig {
        name: name.into(),
        kind,
        host: format!("http://{name}.test:8080"),
        url_base: None,
        username: None,
        password: None,
        enabled: true,
    }
}

/// Snapshot with one Sonarr instance and one qBittorrent client; every
/// policy is disabled and searches are immediate.
#[must_use]
pub fn snapshot_with_sonarr() -> ConfigSnapshot {
    let mut snapshot = ConfigSnapshot::default();
    snapshot.sonarr.instances.push(sonarr_instance());
    snapshot
        .download_clients
        .push(download_client(TORRENT_CLIENT, DownloadClientKind::QBittorrent));
    snapshot.general.search_delay_secs = 0;
    snapshot
}

/// Valid Sonarr torrent record for one episode.
#[must_use]
pub fn episode_record(download_id: &str, episode_id: i64) -> QueueRecord {
    QueueRecord {
        id: episode_id,
        download_id: download_id.into(),
        title: format!("Show.S01E{episode_id:02}"),
        protocol: DownloadProtocol::Torrent,
        series_id: 1,
        episode_id,
        season_number: 1,
        status: "downloading".into(),
        tracked_download_status: "ok".into(),
        tracked_download_state: "downloading".into(),
        size: 1_000,
        size_left: 500,
        ..QueueRecord::default()
    }
}

/// Client view of a download in `state`.
#[must_use]
pub fn download(hash: &str, state: DownloadState) -> DownloadSnapshot {
    DownloadSnapshot {
        hash: hash.into(),
        name: format!("download-{hash}"),
        state,
        total_size: 1_000,
        downloaded_bytes: 500,
        download_speed_bps: 1_000_000,
        eta_secs: Some(60),
        ..DownloadSnapshot::default()
    }
}

/// Seeding download in `category`.
#[must_use]
pub fn seeding(hash: &str, category: &str, ratio: f64, seeding_hours: u64) -> SeedingDownload {
    SeedingDownload {
        hash: hash.into(),
        name: format!("seed-{hash}"),
        category: Some(category.into()),
        ratio,
        seeding_time_secs: seeding_hours * 3_600,
        ..SeedingDownload::default()
    }
}
