mod common;

use common::Harness;
use culler_config::InstanceType;
use culler_core::{RemovalRequest, SearchItem};
use culler_engine::{EngineError, removal_channel};
use culler_events::{DeleteReason, Event};
use culler_test_support::fixtures::{episode_record, snapshot_with_sonarr, sonarr_instance};
use culler_test_support::mocks::DeletedItem;
use tokio_util::sync::CancellationToken;

fn request(download_id: &str) -> RemovalRequest {
    RemovalRequest {
        instance: sonarr_instance(),
        instance_type: InstanceType::Sonarr,
        record: episode_record(download_id, 7),
        search_items: vec![SearchItem::Episode { episode_id: 7 }],
        remove_from_client: true,
        reason: DeleteReason::Stalled,
        is_pack: false,
    }
}

#[tokio::test]
async fn removal_deletes_searches_and_releases_marker() -> anyhow::Result<()> {
    let harness = Harness::new(snapshot_with_sonarr())?;
    let instance_url = sonarr_instance().url;
    assert!(harness.state.guard.try_mark("gone", &instance_url));

    harness
        .state
        .remover()
        .handle(request("gone"), &CancellationToken::new())
        .await?;

    assert_eq!(
        harness.provider.deleted(),
        vec![DeletedItem {
            instance: "sonarr-main".into(),
            download_id: "gone".into(),
            remove_from_client: true,
            reason: DeleteReason::Stalled,
        }]
    );
    assert_eq!(
        harness.provider.searches(),
        vec![vec![SearchItem::Episode { episode_id: 7 }]]
    );
    assert!(!harness.state.guard.is_marked("gone", &instance_url));
    assert!(
        harness
            .events()
            .iter()
            .any(|event| matches!(event, Event::QueueItemDeleted { .. }))
    );
    Ok(())
}

#[tokio::test]
async fn dry_run_neither_deletes_nor_searches() -> anyhow::Result<()> {
    let mut snapshot = snapshot_with_sonarr();
    snapshot.general.dry_run = true;
    let harness = Harness::new(snapshot)?;

    harness
        .state
        .remover()
        .handle(request("dry"), &CancellationToken::new())
        .await?;
    assert!(harness.provider.deleted().is_empty());
    assert!(harness.provider.searches().is_empty());
    Ok(())
}

#[tokio::test]
async fn disabled_search_only_deletes() -> anyhow::Result<()> {
    let mut snapshot = snapshot_with_sonarr();
    snapshot.general.search_enabled = false;
    let harness = Harness::new(snapshot)?;

    harness
        .state
        .remover()
        .handle(request("quiet"), &CancellationToken::new())
        .await?;
    assert_eq!(harness.provider.deleted().len(), 1);
    assert!(harness.provider.searches().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_provider_fails_and_releases_marker() -> anyhow::Result<()> {
    let harness = Harness::new(snapshot_with_sonarr())?;
    let mut orphan = request("orphan");
    orphan.instance_type = InstanceType::Radarr;
    let instance_url = orphan.instance.url.clone();
    assert!(harness.state.guard.try_mark("orphan", &instance_url));

    let result = harness
        .state
        .remover()
        .handle(orphan, &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Backend {
            operation: "queue.provider",
            ..
        })
    ));
    assert!(!harness.state.guard.is_marked("orphan", &instance_url));
    assert!(
        harness
            .events()
            .iter()
            .any(|event| matches!(event, Event::QueueItemDeleteFailed { .. }))
    );
    Ok(())
}

#[tokio::test]
async fn executor_drains_until_senders_drop() -> anyhow::Result<()> {
    let harness = Harness::new(snapshot_with_sonarr())?;
    let (sender, receiver) = removal_channel(4);
    sender.send(request("first")).await?;
    sender.send(request("second")).await?;
    drop(sender);

    let handled = harness
        .state
        .remover()
        .run(receiver, CancellationToken::new())
        .await;
    assert_eq!(handled, 2);
    let ids: Vec<String> = harness
        .provider
        .deleted()
        .into_iter()
        .map(|item| item.download_id)
        .collect();
    assert_eq!(ids, vec!["first".to_string(), "second".to_string()]);
    Ok(())
}

#[tokio::test]
async fn cancelled_removal_skips_the_delete_and_releases_marker() -> anyhow::Result<()> {
    let harness = Harness::new(snapshot_with_sonarr())?;
    let instance_url = sonarr_instance().url;
    assert!(harness.state.guard.try_mark("late", &instance_url));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = harness.state.remover().handle(request("late"), &cancel).await;

    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(harness.provider.deleted().is_empty());
    assert!(harness.provider.searches().is_empty());
    assert!(!harness.state.guard.is_marked("late", &instance_url));
    Ok(())
}
