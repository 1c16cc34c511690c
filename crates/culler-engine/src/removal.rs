//! Removal channel and the executor draining it.
//!
//! # Design
//! - Policies push [`RemovalRequest`]s into a bounded channel; the executor
//!   performs deletions one at a time.
//! - The guard marker placed by the policy is cleared once the request is
//!   handled, whatever the outcome, so the next run may retry a failure.
//! - Dry run logs every mutating call and skips it.

use std::sync::Arc;

use culler_config::ConfigService;
use culler_core::{BackendRegistry, RemovalRequest};
use culler_events::{Event, EventSink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::guard::RemovalGuard;

/// Default number of queued removal requests.
pub const DEFAULT_REMOVAL_CAPACITY: usize = 1_024;

/// Producer half of the removal channel.
#[derive(Debug, Clone)]
pub struct RemovalSender {
    inner: mpsc::Sender<RemovalRequest>,
}

impl RemovalSender {
    /// Queue a request, waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ChannelClosed`] when the executor has stopped.
    pub async fn send(&self, request: RemovalRequest) -> EngineResult<()> {
        self.inner
            .send(request)
            .await
            .map_err(|_| EngineError::ChannelClosed)
    }
}

/// Consumer half of the removal channel.
#[derive(Debug)]
pub struct RemovalReceiver {
    inner: mpsc::Receiver<RemovalRequest>,
}

impl RemovalReceiver {
    /// Next request, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<RemovalRequest> {
        self.inner.recv().await
    }

    /// Next request if one is already queued.
    pub fn try_recv(&mut self) -> Option<RemovalRequest> {
        self.inner.try_recv().ok()
    }
}

/// Create a bounded removal channel.
#[must_use]
pub fn removal_channel(capacity: usize) -> (RemovalSender, RemovalReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (RemovalSender { inner: tx }, RemovalReceiver { inner: rx })
}

/// Executes queued removals against the queue providers.
pub struct QueueItemRemover {
    config: ConfigService,
    registry: Arc<dyn BackendRegistry>,
    events: Arc<dyn EventSink>,
    guard: Arc<RemovalGuard>,
}

impl QueueItemRemover {
    /// Build an executor sharing the engine's guard.
    #[must_use]
    pub fn new(
        config: ConfigService,
        registry: Arc<dyn BackendRegistry>,
        events: Arc<dyn EventSink>,
        guard: Arc<RemovalGuard>,
    ) -> Self {
        Self {
            config,
            registry,
            events,
            guard,
        }
    }

    /// Drain `receiver` until every sender is dropped or `cancel` fires.
    /// Returns the number of requests handled.
    pub async fn run(&self, mut receiver: RemovalReceiver, cancel: CancellationToken) -> u64 {
        let mut handled = 0_u64;
        loop {
            let request = tokio::select! {
                () = cancel.cancelled() => break,
                request = receiver.recv() => request,
            };
            let Some(request) = request else {
                break;
            };
            if let Err(err) = self.handle(request, &cancel).await {
                warn!(error = %err, "queue item removal failed");
            }
            handled += 1;
        }
        debug!(handled, "removal executor stopped");
        handled
    }

    /// Execute one request and release its guard marker.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration, the provider, or the queue
    /// deletion fails. Search failures are only logged.
    pub async fn handle(
        &self,
        request: RemovalRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let result = self.execute(&request, cancel).await;
        if let Err(err) = &result {
            if let Err(emit_err) = self.events.emit(Event::QueueItemDeleteFailed {
                instance_url: request.instance.url.clone(),
                download_id: request.record.download_id.clone(),
                message: err.to_string(),
            }) {
                warn!(error = %emit_err, "failed to publish removal failure");
            }
        }
        self.guard
            .clear(&request.record.download_id, &request.instance.url);
        result
    }

    async fn execute(
        &self,
        request: &RemovalRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        let snapshot = self.config.snapshot().await?;
        let general = &snapshot.general;
        let record = &request.record;
        let instance = &request.instance;

        let provider = self
            .registry
            .queue_provider(request.instance_type)
            .map_err(|err| EngineError::backend("queue.provider", instance.name.clone(), err))?;

        if general.dry_run {
            info!(
                instance = %instance.name,
                download_id = %record.download_id,
                title = %record.title,
                reason = request.reason.as_str(),
                remove_from_client = request.remove_from_client,
                "dry run: would remove queue item"
            );
        } else {
            let deleted = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = provider.delete_queue_item(
                    instance,
                    record,
                    request.remove_from_client,
                    request.reason,
                ) => result,
            };
            deleted
                .map_err(|err| EngineError::backend("queue.delete", instance.name.clone(), err))?;
            info!(
                instance = %instance.name,
                download_id = %record.download_id,
                title = %record.title,
                reason = request.reason.as_str(),
                remove_from_client = request.remove_from_client,
                "queue item removed"
            );
        }

        if let Err(err) = self.events.emit(Event::QueueItemDeleted {
            instance_url: instance.url.clone(),
            download_id: record.download_id.clone(),
            title: record.title.clone(),
            reason: request.reason,
            removed_from_client: request.remove_from_client,
        }) {
            warn!(error = %err, "failed to publish removal event");
        }

        if !general.search_enabled || request.search_items.is_empty() {
            return Ok(());
        }

        let waited = tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(general.search_delay()) => true,
        };
        if !waited {
            debug!(instance = %instance.name, "replacement search skipped on shutdown");
            return Ok(());
        }

        if general.dry_run {
            info!(
                instance = %instance.name,
                searches = request.search_items.len(),
                "dry run: would search for replacements"
            );
            return Ok(());
        }

        let searched = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = provider.search_items(instance, &request.search_items) => Some(result),
        };
        match searched {
            None => {
                debug!(instance = %instance.name, "replacement search abandoned on shutdown");
            }
            Some(Err(err)) => {
                warn!(instance = %instance.name, error = %err, "replacement search failed");
            }
            Some(Ok(())) => {
                debug!(instance = %instance.name, searches = request.search_items.len(), "replacement search triggered");
            }
        }
        Ok(())
    }
}
