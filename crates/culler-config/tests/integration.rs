use std::sync::Arc;

use culler_config::{
    ConfigError, ConfigService, FileConfigSource, InstanceType, Schedule, validate_snapshot,
};

const DOCUMENT: &str = r"
general:
  dry_run: false
  search_delay_secs: 5
radarr:
  instances:
    - name: movies
      url: https://radarr.local
      api_key: abc
content_blocker:
  enabled: true
  schedule:
    type: interval
    every: 30
    unit: minutes
  radarr:
    enabled: true
    path: /config/blocklist.txt
    mode: whitelist
download_cleaner:
  categories:
    - name: movies
      max_ratio: 2.0
";

#[tokio::test]
async fn file_source_round_trips_through_service() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("culler.yaml");
    tokio::fs::write(&path, DOCUMENT).await?;

    let service = ConfigService::new(Arc::new(FileConfigSource::new(&path)));
    let snapshot = service.snapshot().await?;
    assert_eq!(snapshot.revision, 1);
    assert_eq!(snapshot.arr(InstanceType::Radarr).instances[0].name, "movies");
    assert!(matches!(
        snapshot.content_blocker.schedule,
        Schedule::Interval { every: 30, .. }
    ));
    assert!(snapshot.download_cleaner.categories[0].max_seed_time_hours < 0.0);

    let mut changed = (*snapshot).clone();
    changed.general.dry_run = true;
    service.replace(changed).await?;

    let reloaded = ConfigService::new(Arc::new(FileConfigSource::new(&path)))
        .snapshot()
        .await?;
    assert!(reloaded.general.dry_run);
    validate_snapshot(&reloaded)?;
    Ok(())
}

#[tokio::test]
async fn missing_file_reports_io_error() {
    let service = ConfigService::new(Arc::new(FileConfigSource::new(
        "/definitely/not/here/culler.json",
    )));
    let result = service.snapshot().await;
    assert!(matches!(result, Err(ConfigError::Io { operation: "config.read", .. })));
}
