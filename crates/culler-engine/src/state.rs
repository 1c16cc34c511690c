//! Shared engine state handed to every policy run.

use std::sync::Arc;

use culler_config::{ConfigService, defaults};
use culler_core::BackendRegistry;
use culler_events::EventSink;
use culler_fsops::{LinkCounter, platform_link_counter};
use culler_telemetry::Metrics;

use crate::blocklist::BlocklistProvider;
use crate::guard::RemovalGuard;
use crate::removal::{QueueItemRemover, RemovalSender};
use crate::strikes::{ProgressTracker, StrikeLedger};

/// Long-lived collaborators shared by the policy runners and the removal
/// executor.
#[derive(Clone)]
pub struct EngineState {
    /// Configuration snapshots.
    pub config: ConfigService,
    /// Backend adapters.
    pub registry: Arc<dyn BackendRegistry>,
    /// Event publication.
    pub events: Arc<dyn EventSink>,
    /// Prometheus counters.
    pub metrics: Metrics,
    /// Strike counters shared across runs.
    pub strikes: Arc<StrikeLedger>,
    /// Last observed download progress.
    pub progress: Arc<ProgressTracker>,
    /// Pending removal markers.
    pub guard: Arc<RemovalGuard>,
    /// Published blocklists.
    pub blocklists: Arc<BlocklistProvider>,
    /// Hardlink census implementation.
    pub link_counter: Arc<dyn LinkCounter>,
    /// Producer side of the removal channel.
    pub removals: RemovalSender,
}

impl EngineState {
    /// Build fresh ledgers around the given collaborators, using the
    /// platform hardlink census.
    #[must_use]
    pub fn new(
        config: ConfigService,
        registry: Arc<dyn BackendRegistry>,
        events: Arc<dyn EventSink>,
        metrics: Metrics,
        removals: RemovalSender,
    ) -> Self {
        let window = defaults::TRIGGER_MAX_LIMIT + defaults::STRIKE_WINDOW_BUFFER;
        Self {
            strikes: Arc::new(StrikeLedger::new(
                window,
                Arc::clone(&events),
                metrics.clone(),
            )),
            progress: Arc::new(ProgressTracker::new(window)),
            guard: Arc::new(RemovalGuard::default()),
            blocklists: Arc::new(BlocklistProvider::new(Arc::clone(&events), metrics.clone())),
            link_counter: platform_link_counter(),
            config,
            registry,
            events,
            metrics,
            removals,
        }
    }

    /// Replace the hardlink census implementation.
    #[must_use]
    pub fn with_link_counter(mut self, link_counter: Arc<dyn LinkCounter>) -> Self {
        self.link_counter = link_counter;
        self
    }

    /// Removal executor sharing this state's guard and collaborators.
    #[must_use]
    pub fn remover(&self) -> QueueItemRemover {
        QueueItemRemover::new(
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.events),
            Arc::clone(&self.guard),
        )
    }
}
