mod common;

use common::Harness;
use culler_config::{CleanCategory, ConfigSnapshot};
use culler_engine::{DownloadCleaner, EngineError, PolicyRunner};
use culler_events::{CleanReason, Event};
use culler_test_support::fixtures::{SONARR_URL, episode_record, seeding, snapshot_with_sonarr};
use culler_test_support::mocks::ClientCall;

fn cleaner_snapshot() -> ConfigSnapshot {
    let mut snapshot = snapshot_with_sonarr();
    snapshot.download_cleaner.enabled = true;
    snapshot.download_cleaner.settle_delay_secs = 0;
    snapshot.download_cleaner.categories = vec![CleanCategory {
        name: "tv".into(),
        max_ratio: 2.0,
        min_seed_time_hours: 1.0,
        max_seed_time_hours: 100.0,
    }];
    snapshot
}

#[tokio::test]
async fn seeding_limits_delete_downloads() -> anyhow::Result<()> {
    let harness = Harness::new(cleaner_snapshot())?;
    harness.client.set_seeding(vec![
        seeding("ratio", "tv", 2.5, 2),
        seeding("young", "tv", 5.0, 0),
        seeding("old", "tv", 0.1, 200),
        seeding("other", "movies", 9.0, 500),
    ]);

    PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;

    assert_eq!(
        harness.client.calls(),
        vec![
            ClientCall::DeleteDownload {
                hash: "ratio".into(),
                delete_data: true,
            },
            ClientCall::DeleteDownload {
                hash: "old".into(),
                delete_data: true,
            },
        ]
    );
    let reasons: Vec<CleanReason> = harness
        .events()
        .into_iter()
        .filter_map(|event| match event {
            Event::DownloadCleaned { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(
        reasons,
        vec![CleanReason::MaxRatioReached, CleanReason::MaxSeedTimeReached]
    );
    Ok(())
}

#[tokio::test]
async fn queued_private_and_ignored_downloads_are_kept() -> anyhow::Result<()> {
    let mut snapshot = cleaner_snapshot();
    snapshot.general.ignored_downloads = vec!["tracker.example".into()];
    let harness = Harness::new(snapshot)?;
    harness.provider.set_queue(vec![episode_record("QUEUED", 1)]);

    let mut private = seeding("private", "tv", 10.0, 10);
    private.is_private = true;
    let mut ignored = seeding("ignored", "tv", 10.0, 10);
    ignored.trackers = vec!["https://announce.tracker.example/announce".into()];
    harness.client.set_seeding(vec![
        seeding("queued", "tv", 10.0, 10),
        private,
        ignored,
    ]);

    let summary = PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;
    assert_eq!(summary.removals_requested, 0);
    assert!(harness.client.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn skipped_queue_groups_still_protect_their_downloads() -> anyhow::Result<()> {
    let harness = Harness::new(cleaner_snapshot())?;
    let mut invalid = episode_record("QUEUED", 1);
    invalid.episode_id = 0;
    harness
        .provider
        .set_queue(vec![invalid, episode_record("PENDING", 3)]);
    assert!(harness.state.guard.try_mark("PENDING", SONARR_URL));
    harness.client.set_seeding(vec![
        seeding("queued", "tv", 5.0, 10),
        seeding("pending", "tv", 5.0, 10),
        seeding("orphan", "tv", 5.0, 10),
    ]);

    PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;

    assert_eq!(
        harness.client.calls(),
        vec![ClientCall::DeleteDownload {
            hash: "orphan".into(),
            delete_data: true,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn dry_run_only_logs_deletions() -> anyhow::Result<()> {
    let mut snapshot = cleaner_snapshot();
    snapshot.general.dry_run = true;
    let harness = Harness::new(snapshot)?;
    harness
        .client
        .set_seeding(vec![seeding("ratio", "tv", 3.0, 5)]);

    PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;
    assert!(harness.client.calls().is_empty());
    assert_eq!(harness.state.metrics.snapshot().downloads_cleaned_total, 0);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn unlinked_downloads_move_to_target_category() -> anyhow::Result<()> {
    use std::fs;

    use culler_core::DownloadFile;

    let dir = tempfile::tempdir()?;
    let downloads = dir.path().join("downloads");
    let library = dir.path().join("library");
    fs::create_dir_all(&downloads)?;
    fs::create_dir_all(&library)?;
    fs::write(downloads.join("lonely.mkv"), b"data")?;
    fs::write(downloads.join("linked.mkv"), b"data")?;
    fs::hard_link(downloads.join("linked.mkv"), library.join("linked.mkv"))?;

    let mut snapshot = cleaner_snapshot();
    snapshot.download_cleaner.categories.clear();
    snapshot.download_cleaner.unlinked_target_category = Some("unlinked".into());
    snapshot.download_cleaner.unlinked_categories = vec!["tv".into()];
    let harness = Harness::new(snapshot)?;

    let save_path = downloads.display().to_string();
    let mut lonely = seeding("lonely", "tv", 0.0, 1);
    lonely.save_path.clone_from(&save_path);
    lonely.files = vec![DownloadFile {
        index: 0,
        name: "lonely.mkv".into(),
        skipped: false,
    }];
    let mut linked = seeding("linked", "tv", 0.0, 1);
    linked.save_path = save_path;
    linked.files = vec![DownloadFile {
        index: 0,
        name: "linked.mkv".into(),
        skipped: false,
    }];
    harness.client.set_seeding(vec![lonely, linked]);

    PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;

    assert_eq!(
        harness.client.calls(),
        vec![
            ClientCall::CreateCategory("unlinked".into()),
            ClientCall::ChangeCategory {
                hash: "lonely".into(),
                category: "unlinked".into(),
            },
        ]
    );
    assert_eq!(harness.state.metrics.snapshot().categories_changed_total, 1);
    Ok(())
}

fn unlinked_snapshot() -> ConfigSnapshot {
    let mut snapshot = cleaner_snapshot();
    snapshot.download_cleaner.unlinked_target_category = Some("unlinked".into());
    snapshot.download_cleaner.unlinked_categories = vec!["tv".into()];
    snapshot
}

#[tokio::test]
async fn category_creation_failure_aborts_before_cleaning() -> anyhow::Result<()> {
    let harness = Harness::new(unlinked_snapshot())?;
    harness.client.fail_category_creation();
    harness
        .client
        .set_seeding(vec![seeding("ratio", "tv", 3.0, 5)]);

    let result = PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await;

    assert!(matches!(
        result,
        Err(EngineError::Backend {
            operation: "download.create_category",
            ..
        })
    ));
    assert!(harness.client.calls().is_empty());
    assert_eq!(harness.state.metrics.snapshot().downloads_cleaned_total, 0);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn uninspectable_files_leave_the_download_alone() -> anyhow::Result<()> {
    use culler_core::DownloadFile;

    let dir = tempfile::tempdir()?;
    let mut snapshot = unlinked_snapshot();
    snapshot.download_cleaner.categories.clear();
    let harness = Harness::new(snapshot)?;

    let mut missing = seeding("missing", "tv", 0.0, 1);
    missing.save_path = dir.path().display().to_string();
    missing.files = vec![DownloadFile {
        index: 0,
        name: "gone.mkv".into(),
        skipped: false,
    }];
    harness.client.set_seeding(vec![missing]);

    PolicyRunner::new(DownloadCleaner, harness.state.clone())
        .execute()
        .await?;

    assert_eq!(
        harness.client.calls(),
        vec![ClientCall::CreateCategory("unlinked".into())]
    );
    assert_eq!(harness.state.metrics.snapshot().categories_changed_total, 0);
    Ok(())
}
