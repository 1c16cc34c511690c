use std::sync::{Arc, Mutex, PoisonError};

use culler_config::InstanceType;
use culler_engine::{EngineError, QueueIterator};
use culler_test_support::fixtures::{episode_record, sonarr_instance};
use culler_test_support::mocks::FakeQueueProvider;
use tokio_util::sync::CancellationToken;

fn provider_with(count: i64) -> FakeQueueProvider {
    let provider = FakeQueueProvider::new(InstanceType::Sonarr);
    provider.set_queue(
        (1..=count)
            .map(|id| episode_record(&format!("hash-{id}"), id))
            .collect(),
    );
    provider
}

fn requested_pages(provider: &FakeQueueProvider) -> Vec<u32> {
    provider
        .page_requests()
        .into_iter()
        .map(|(_, page)| page)
        .collect()
}

#[tokio::test]
async fn short_page_ends_iteration() -> anyhow::Result<()> {
    let provider = provider_with(5);
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&batches);

    let delivered = QueueIterator::new(2)
        .iterate(
            &provider,
            &sonarr_instance(),
            &CancellationToken::new(),
            move |batch| {
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(batch.len());
                async { Ok(()) }
            },
        )
        .await?;

    assert_eq!(delivered, 5);
    assert_eq!(*batches.lock().unwrap_or_else(PoisonError::into_inner), vec![2, 2, 1]);
    assert_eq!(requested_pages(&provider), vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn reported_total_ends_iteration_on_a_full_page() -> anyhow::Result<()> {
    let provider = provider_with(4);
    let instance = sonarr_instance();
    let mut pager = QueueIterator::new(2).pages(&provider, &instance);
    let cancel = CancellationToken::new();

    let mut seen = 0;
    while let Some(batch) = pager.next_batch(&cancel).await? {
        seen += batch.len();
    }
    assert_eq!(seen, 4);
    assert_eq!(requested_pages(&provider), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn empty_queue_yields_nothing() -> anyhow::Result<()> {
    let provider = provider_with(0);
    let delivered = QueueIterator::default()
        .iterate(
            &provider,
            &sonarr_instance(),
            &CancellationToken::new(),
            |_| async { Ok(()) },
        )
        .await?;
    assert_eq!(delivered, 0);
    assert_eq!(requested_pages(&provider), vec![1]);
    Ok(())
}

#[tokio::test]
async fn cancelled_iteration_stops_before_fetching() {
    let provider = provider_with(3);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = QueueIterator::new(1)
        .iterate(&provider, &sonarr_instance(), &cancel, |_| async { Ok(()) })
        .await;
    assert!(matches!(result, Err(EngineError::Cancelled)));
    assert!(provider.page_requests().is_empty());
}

#[tokio::test]
async fn provider_failure_names_the_instance() {
    let provider = provider_with(3);
    provider.fail_instance("sonarr-main");

    let result = QueueIterator::new(10)
        .iterate(
            &provider,
            &sonarr_instance(),
            &CancellationToken::new(),
            |_| async { Ok(()) },
        )
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Backend { operation: "queue.fetch", ref target, .. }) if target == "sonarr-main"
    ));
}
