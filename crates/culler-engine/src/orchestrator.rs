//! Policy runner shared by the queue cleaner, content blocker, and download
//! cleaner.
//!
//! # Design
//! - A run loads one configuration snapshot and threads it through a
//!   [`RunContext`]; nothing is read from ambient state mid-run.
//! - Instances are processed one after another. An instance failure is
//!   logged and the next instance processed, unless the policy asks to fail
//!   fast.
//! - A removal is requested at most once per (download, instance) while the
//!   guard marker lives; the marker is released if the request cannot be
//!   queued.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use culler_config::{ArrInstance, ConfigSnapshot, DownloadProtocol, InstanceType};
use culler_core::{DownloadService, QueueProvider, QueueRecord, RemovalRequest, SearchItem};
use culler_events::{DeleteReason, Event};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ignore::IgnoredDownloads;
use crate::iterator::{QueueIterator, group_by_download_id};
use crate::state::EngineState;

/// Outcome of [`Policy::decide`] for one download group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave the queue item alone.
    Keep,
    /// Ask the removal executor to delete the queue item.
    Remove {
        /// Also delete the download from the client.
        remove_from_client: bool,
        /// Why the item goes.
        reason: DeleteReason,
    },
}

/// Per-run state handed to every policy hook.
pub struct RunContext {
    /// Identifier of this run, also recorded on the run span.
    pub run_id: Uuid,
    /// Configuration the run operates on.
    pub snapshot: Arc<ConfigSnapshot>,
    /// Download clients that accepted a login.
    pub services: Vec<Arc<dyn DownloadService>>,
    /// Operator ignore list.
    pub ignored: IgnoredDownloads,
    /// Cancellation for every awaited call of the run.
    pub cancel: CancellationToken,
    /// Shared engine collaborators.
    pub state: EngineState,
    excluded: Mutex<HashSet<String>>,
}

impl RunContext {
    /// Assemble a context; normally done by [`PolicyRunner`].
    #[must_use]
    pub fn new(
        snapshot: Arc<ConfigSnapshot>,
        services: Vec<Arc<dyn DownloadService>>,
        cancel: CancellationToken,
        state: EngineState,
    ) -> Self {
        let ignored = IgnoredDownloads::new(&snapshot.general.ignored_downloads);
        Self {
            run_id: Uuid::new_v4(),
            snapshot,
            services,
            ignored,
            cancel,
            state,
            excluded: Mutex::new(HashSet::new()),
        }
    }

    /// Whether mutating calls are only logged.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.snapshot.general.dry_run
    }

    /// Logged-in clients transferring `protocol`.
    pub fn services_supporting(
        &self,
        protocol: DownloadProtocol,
    ) -> impl Iterator<Item = &Arc<dyn DownloadService>> {
        self.services
            .iter()
            .filter(move |service| service.supports(protocol))
    }

    /// Remember a download id seen in a provider queue.
    pub fn exclude(&self, download_id: &str) {
        self.excluded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(download_id.to_ascii_lowercase());
    }

    /// Whether a download id was seen in a provider queue during this run.
    #[must_use]
    pub fn is_excluded(&self, download_id: &str) -> bool {
        self.excluded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&download_id.to_ascii_lowercase())
    }

    /// Await `future` unless the run is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cancelled`] when the token fires first.
    pub async fn guarded<F, T>(&self, future: F) -> EngineResult<T>
    where
        F: Future<Output = T> + Send,
    {
        tokio::select! {
            () = self.cancel.cancelled() => Err(EngineError::Cancelled),
            output = future => Ok(output),
        }
    }
}

/// Remediation policy plugged into the shared runner.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Stable policy name used in logs, metrics, and events.
    fn name(&self) -> &'static str;

    /// Whether the policy should run for `snapshot`.
    fn is_enabled(&self, snapshot: &ConfigSnapshot) -> bool;

    /// Whether queues of `instance_type` take part in the run.
    fn handles(&self, snapshot: &ConfigSnapshot, instance_type: InstanceType) -> bool {
        let _ = (snapshot, instance_type);
        true
    }

    /// Hook run once the context is assembled, before any queue is read.
    async fn prepare(&self, ctx: &mut RunContext) -> EngineResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Sees every download group of a queue, including groups skipped as
    /// invalid, ignored, or already pending removal.
    fn observe(&self, ctx: &RunContext, group: &[QueueRecord]) {
        let _ = (ctx, group);
    }

    /// Decide the fate of one download group.
    async fn decide(
        &self,
        ctx: &RunContext,
        instance_type: InstanceType,
        instance: &ArrInstance,
        group: &[QueueRecord],
    ) -> EngineResult<Decision>;

    /// Hook run after every queue has been processed.
    async fn on_queue_drained(&self, ctx: &RunContext) -> EngineResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Whether an instance failure aborts the whole run.
    fn fail_fast(&self) -> bool {
        false
    }
}

/// Counters reported by a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: Uuid,
    /// Policy name.
    pub policy: &'static str,
    /// The policy was disabled and nothing ran.
    pub skipped: bool,
    /// Instances processed without error.
    pub instances_processed: u32,
    /// Instances whose processing failed.
    pub failed_instances: u32,
    /// Queue records read.
    pub records_seen: u64,
    /// Removal requests queued.
    pub removals_requested: u64,
}

impl RunSummary {
    const fn new(run_id: Uuid, policy: &'static str) -> Self {
        Self {
            run_id,
            policy,
            skipped: false,
            instances_processed: 0,
            failed_instances: 0,
            records_seen: 0,
            removals_requested: 0,
        }
    }
}

/// Drives one [`Policy`] through a complete run.
pub struct PolicyRunner<P> {
    policy: P,
    state: EngineState,
    iterator: QueueIterator,
}

impl<P: Policy> PolicyRunner<P> {
    /// Pair a policy with the shared engine state.
    #[must_use]
    pub fn new(policy: P, state: EngineState) -> Self {
        Self {
            policy,
            state,
            iterator: QueueIterator::default(),
        }
    }

    /// Override the queue paging.
    #[must_use]
    pub const fn with_iterator(mut self, iterator: QueueIterator) -> Self {
        self.iterator = iterator;
        self
    }

    /// The wrapped policy.
    #[must_use]
    pub const fn policy(&self) -> &P {
        &self.policy
    }

    /// Run the policy to completion.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: configuration, registry lookup,
    /// policy preparation, a closed removal channel, or any instance failure
    /// for fail-fast policies.
    pub async fn execute(&self) -> EngineResult<RunSummary> {
        self.execute_with_cancellation(CancellationToken::new())
            .await
    }

    /// Run the policy, stopping with [`EngineError::Cancelled`] once
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`PolicyRunner::execute`].
    pub async fn execute_with_cancellation(
        &self,
        cancel: CancellationToken,
    ) -> EngineResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("policy_run", policy = self.policy.name(), run_id = %run_id);
        async move {
            let outcome = self.run(run_id, cancel).await;
            self.record_outcome(&outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, run_id: Uuid, cancel: CancellationToken) -> EngineResult<RunSummary> {
        let name = self.policy.name();
        let snapshot = self.state.config.snapshot().await?;
        if !self.policy.is_enabled(&snapshot) {
            debug!("policy disabled");
            let mut summary = RunSummary::new(run_id, name);
            summary.skipped = true;
            return Ok(summary);
        }

        let window = snapshot.strike_window();
        self.state.strikes.set_window(window);
        self.state.progress.set_window(window);

        let services = self.connect_services(&snapshot, &cancel).await?;
        let mut ctx = RunContext::new(snapshot, services, cancel, self.state.clone());
        ctx.run_id = run_id;
        self.policy.prepare(&mut ctx).await?;

        let mut summary = RunSummary::new(run_id, name);
        for instance_type in InstanceType::ALL {
            if !self.policy.handles(&ctx.snapshot, instance_type) {
                continue;
            }
            let instances: Vec<ArrInstance> = ctx
                .snapshot
                .arr(instance_type)
                .enabled_instances()
                .cloned()
                .collect();
            if instances.is_empty() {
                continue;
            }
            let provider = self
                .state
                .registry
                .queue_provider(instance_type)
                .map_err(|err| EngineError::backend("queue.provider", instance_type.as_str(), err))?;

            for instance in &instances {
                let result = self
                    .process_instance(&ctx, provider.as_ref(), instance_type, instance, &mut summary)
                    .await;
                match result {
                    Ok(()) => summary.instances_processed += 1,
                    Err(err @ (EngineError::Cancelled | EngineError::ChannelClosed)) => {
                        return Err(err);
                    }
                    Err(err) if self.policy.fail_fast() => return Err(err),
                    Err(err) => {
                        warn!(instance = %instance.name, error = %err, "instance processing failed");
                        summary.failed_instances += 1;
                    }
                }
            }
        }

        self.policy.on_queue_drained(&ctx).await?;
        Ok(summary)
    }

    async fn connect_services(
        &self,
        snapshot: &ConfigSnapshot,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<Arc<dyn DownloadService>>> {
        let mut services = Vec::new();
        for client in snapshot.enabled_download_clients() {
            let service = self
                .state
                .registry
                .download_service(client)
                .map_err(|err| EngineError::backend("download.resolve", client.name.clone(), err))?;
            let login = tokio::select! {
                () = cancel.cancelled() => return Err(EngineError::Cancelled),
                result = service.login() => result,
            };
            match login {
                Ok(()) => services.push(service),
                Err(err) => warn!(client = %client.name, error = %err, "download client login failed, client skipped"),
            }
        }
        Ok(services)
    }

    async fn process_instance(
        &self,
        ctx: &RunContext,
        provider: &dyn QueueProvider,
        instance_type: InstanceType,
        instance: &ArrInstance,
        summary: &mut RunSummary,
    ) -> EngineResult<()> {
        let mut pager = self.iterator.pages(provider, instance);
        while let Some(batch) = pager.next_batch(&ctx.cancel).await? {
            summary.records_seen += batch.len() as u64;
            for group in group_by_download_id(batch) {
                if ctx.cancel.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                if self
                    .process_group(ctx, provider, instance_type, instance, &group)
                    .await?
                {
                    summary.removals_requested += 1;
                }
            }
        }
        debug!(instance = %instance.name, "instance processed");
        Ok(())
    }

    async fn process_group(
        &self,
        ctx: &RunContext,
        provider: &dyn QueueProvider,
        instance_type: InstanceType,
        instance: &ArrInstance,
        group: &[QueueRecord],
    ) -> EngineResult<bool> {
        let Some(first) = group.first() else {
            return Ok(false);
        };
        let download_id = first.download_id.as_str();
        self.policy.observe(ctx, group);
        if group.iter().any(|record| !provider.is_record_valid(record)) {
            debug!(download_id, "queue record lacks identifiers, skipped");
            return Ok(false);
        }
        if ctx.ignored.contains_id(download_id) {
            info!(download_id, title = %first.title, "download ignored");
            return Ok(false);
        }
        if self.state.guard.is_marked(download_id, &instance.url) {
            debug!(download_id, "removal already pending");
            return Ok(false);
        }

        let Decision::Remove {
            remove_from_client,
            reason,
        } = self
            .policy
            .decide(ctx, instance_type, instance, group)
            .await?
        else {
            return Ok(false);
        };

        if !self.state.guard.try_mark(download_id, &instance.url) {
            return Ok(false);
        }

        let is_pack = group.len() > 1;
        let search_type = ctx.snapshot.arr(instance_type).search_type;
        let request = RemovalRequest {
            instance: instance.clone(),
            instance_type,
            record: first.clone(),
            search_items: SearchItem::from_records(instance_type, search_type, group, is_pack),
            remove_from_client,
            reason,
            is_pack,
        };

        match ctx.guarded(self.state.removals.send(request)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) | Err(err) => {
                self.state.guard.clear(download_id, &instance.url);
                return Err(err);
            }
        }

        self.state.metrics.inc_removal_requested(reason.as_str());
        if let Err(err) = self.state.events.emit(Event::QueueItemRemovalRequested {
            instance_url: instance.url.clone(),
            download_id: download_id.to_string(),
            title: first.title.clone(),
            reason,
            remove_from_client,
        }) {
            warn!(error = %err, download_id, "failed to publish removal request");
        }
        info!(
            instance = %instance.name,
            download_id,
            title = %first.title,
            reason = reason.as_str(),
            remove_from_client,
            "removal requested"
        );
        Ok(true)
    }

    fn record_outcome(&self, outcome: &EngineResult<RunSummary>) {
        let name = self.policy.name();
        match outcome {
            Ok(summary) if summary.skipped => {
                self.state.metrics.inc_policy_run(name, "skipped");
            }
            Ok(summary) => {
                self.state.metrics.inc_policy_run(name, "completed");
                if let Err(err) = self.state.events.emit(Event::PolicyRunCompleted {
                    policy: name.to_string(),
                    removals_requested: summary.removals_requested,
                    failed_instances: summary.failed_instances,
                }) {
                    warn!(error = %err, "failed to publish run completion");
                }
                info!(
                    instances = summary.instances_processed,
                    failed_instances = summary.failed_instances,
                    records = summary.records_seen,
                    removals = summary.removals_requested,
                    "policy run completed"
                );
            }
            Err(EngineError::Cancelled) => {
                self.state.metrics.inc_policy_run(name, "cancelled");
                warn!("policy run cancelled");
            }
            Err(err) => {
                self.state.metrics.inc_policy_run(name, "failed");
                if let Err(emit_err) = self.state.events.emit(Event::PolicyRunFailed {
                    policy: name.to_string(),
                    message: err.to_string(),
                }) {
                    warn!(error = %emit_err, "failed to publish run failure");
                }
                error!(error = %err, "policy run failed");
            }
        }
    }
}
