use std::fs;
use std::sync::Arc;
use std::time::Duration;

use culler_config::{BlocklistMode, ContentBlockerConfig, InstanceType};
use culler_engine::{BlocklistError, BlocklistProvider};
use culler_events::EventBus;
use culler_telemetry::Metrics;
use httpmock::prelude::*;

const TIMEOUT: Duration = Duration::from_secs(5);

fn sonarr_list(source: &str, mode: BlocklistMode) -> ContentBlockerConfig {
    let mut config = ContentBlockerConfig::default();
    config.enabled = true;
    config.sonarr.enabled = true;
    config.sonarr.path = Some(source.to_string());
    config.sonarr.mode = mode;
    config
}

fn reload_count(bus: &EventBus) -> usize {
    bus.backlog_of("blocklist_reloaded").len()
}

#[tokio::test]
async fn remote_blocklist_is_compiled() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET).path("/lists/sonarr.txt");
        then.status(200).body("*.exe\n*sample*\nregex:^rarbg\\.com\n");
    });

    let bus = EventBus::new();
    let provider = BlocklistProvider::new(Arc::new(bus.clone()), Metrics::new()?);
    let config = sonarr_list(&server.url("/lists/sonarr.txt"), BlocklistMode::Blacklist);
    provider.load(&config, TIMEOUT).await?;

    mock.assert();
    let published = provider.snapshot(InstanceType::Sonarr);
    assert_eq!(published.len(), 3);
    assert!(!published.is_valid("setup.exe"));
    assert!(!published.is_valid("the-SAMPLE-cut.mkv"));
    assert!(!published.is_valid("RARBG.com.txt"));
    assert!(published.is_valid("Show.S01E01.mkv"));
    assert_eq!(provider.mode(InstanceType::Radarr), BlocklistMode::Blacklist);
    assert!(provider.patterns(InstanceType::Radarr).is_empty());
    Ok(())
}

#[tokio::test]
async fn invalid_regex_lines_do_not_poison_the_list() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("list.txt");
    fs::write(&list, "regex:(unclosed\nkeep.me\n")?;

    let provider = BlocklistProvider::new(Arc::new(EventBus::new()), Metrics::new()?);
    let config = sonarr_list(&list.display().to_string(), BlocklistMode::Blacklist);
    provider.load(&config, TIMEOUT).await?;

    assert_eq!(provider.patterns(InstanceType::Sonarr).len(), 1);
    assert!(provider.regexes(InstanceType::Sonarr).is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_fetch_keeps_previous_set() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let mut ok = server.mock(|when, then| {
        when.method(GET).path("/list.txt");
        then.status(200).body("*.exe\n");
    });

    let provider = BlocklistProvider::new(Arc::new(EventBus::new()), Metrics::new()?)
        .with_reload_interval(Duration::ZERO);
    let config = sonarr_list(&server.url("/list.txt"), BlocklistMode::Blacklist);
    provider.load(&config, TIMEOUT).await?;
    assert_eq!(provider.patterns(InstanceType::Sonarr).len(), 1);

    ok.delete();
    let failing = server.mock(|when, then| {
        when.method(GET).path("/list.txt");
        then.status(503);
    });
    let result = provider.load(&config, TIMEOUT).await;
    assert!(matches!(result, Err(BlocklistError::Fetch { .. })));
    failing.assert();
    assert_eq!(provider.patterns(InstanceType::Sonarr).len(), 1);
    assert!(!provider.snapshot(InstanceType::Sonarr).is_valid("virus.exe"));
    Ok(())
}

#[tokio::test]
async fn unchanged_source_is_not_reloaded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let list = dir.path().join("list.txt");
    fs::write(&list, "*.nfo\n")?;
    let source = list.display().to_string();

    let bus = EventBus::new();
    let provider = BlocklistProvider::new(Arc::new(bus.clone()), Metrics::new()?);
    provider
        .load(&sonarr_list(&source, BlocklistMode::Blacklist), TIMEOUT)
        .await?;
    provider
        .load(&sonarr_list(&source, BlocklistMode::Blacklist), TIMEOUT)
        .await?;
    assert_eq!(reload_count(&bus), 1);

    provider
        .load(&sonarr_list(&source, BlocklistMode::Whitelist), TIMEOUT)
        .await?;
    assert_eq!(reload_count(&bus), 2);
    assert_eq!(provider.mode(InstanceType::Sonarr), BlocklistMode::Whitelist);
    Ok(())
}
