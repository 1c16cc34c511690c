mod common;

use std::fs;

use common::Harness;
use culler_config::{BlocklistMode, ConfigSnapshot};
use culler_core::{DownloadFile, DownloadState};
use culler_engine::{ContentBlocker, EngineError, PolicyRunner};
use culler_events::DeleteReason;
use culler_test_support::fixtures::{download, episode_record, snapshot_with_sonarr};
use culler_test_support::mocks::ClientCall;

fn blocker_snapshot(path: &str, mode: BlocklistMode) -> ConfigSnapshot {
    let mut snapshot = snapshot_with_sonarr();
    snapshot.content_blocker.enabled = true;
    snapshot.content_blocker.sonarr.enabled = true;
    snapshot.content_blocker.sonarr.path = Some(path.to_string());
    snapshot.content_blocker.sonarr.mode = mode;
    snapshot
}

fn file(index: usize, name: &str) -> DownloadFile {
    DownloadFile {
        index,
        name: name.into(),
        skipped: false,
    }
}

#[tokio::test]
async fn unwanted_files_are_skipped_and_torrent_kept() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("blocklist.txt");
    fs::write(&list, "*.exe\nsample*\nregex:(unclosed\n")?;
    let list_path = list.display().to_string();

    let mut harness = Harness::new(blocker_snapshot(&list_path, BlocklistMode::Blacklist))?;
    harness.provider.set_queue(vec![episode_record("mixed", 1)]);
    let mut torrent = download("mixed", DownloadState::Downloading);
    torrent.files = vec![
        file(0, "Show/Show.S01E01.mkv"),
        file(1, "Show/sample.mkv"),
        file(2, "Show/setup.EXE"),
    ];
    harness.client.put_download(torrent);

    let summary = PolicyRunner::new(ContentBlocker, harness.state.clone())
        .execute()
        .await?;
    assert_eq!(summary.removals_requested, 0);
    assert!(harness.drain_requests().is_empty());
    assert_eq!(
        harness.client.calls(),
        vec![ClientCall::SkipFiles {
            hash: "mixed".into(),
            indexes: vec![1, 2],
        }]
    );
    assert_eq!(harness.state.blocklists.patterns(culler_config::InstanceType::Sonarr).len(), 2);
    Ok(())
}

#[tokio::test]
async fn fully_blocked_torrent_is_removed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("whitelist.txt");
    fs::write(&list, "*.mkv\n")?;
    let list_path = list.display().to_string();

    let mut harness = Harness::new(blocker_snapshot(&list_path, BlocklistMode::Whitelist))?;
    harness.provider.set_queue(vec![episode_record("junk", 1)]);
    let mut torrent = download("junk", DownloadState::Downloading);
    torrent.is_private = true;
    torrent.files = vec![file(0, "junk.exe"), file(1, "junk.scr")];
    harness.client.put_download(torrent);

    PolicyRunner::new(ContentBlocker, harness.state.clone())
        .execute()
        .await?;
    let requests = harness.drain_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].reason, DeleteReason::AllFilesBlocked);
    assert!(!requests[0].remove_from_client);
    assert!(harness.client.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn dry_run_leaves_files_untouched() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("blocklist.txt");
    fs::write(&list, "*.nfo\n")?;
    let mut snapshot = blocker_snapshot(&list.display().to_string(), BlocklistMode::Blacklist);
    snapshot.general.dry_run = true;

    let harness = Harness::new(snapshot)?;
    harness.provider.set_queue(vec![episode_record("info", 1)]);
    let mut torrent = download("info", DownloadState::Downloading);
    torrent.files = vec![file(0, "movie.mkv"), file(1, "movie.nfo")];
    harness.client.put_download(torrent);

    PolicyRunner::new(ContentBlocker, harness.state.clone())
        .execute()
        .await?;
    assert!(harness.client.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_blocklist_fails_the_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.txt").display().to_string();
    let harness = Harness::new(blocker_snapshot(&missing, BlocklistMode::Blacklist))?;

    let result = PolicyRunner::new(ContentBlocker, harness.state.clone())
        .execute()
        .await;
    assert!(matches!(result, Err(EngineError::Blocklist { .. })));
    assert!(harness.provider.page_requests().is_empty());
    Ok(())
}
