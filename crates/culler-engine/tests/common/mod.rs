#![allow(dead_code)]

use std::sync::Arc;

use culler_config::{ConfigService, ConfigSnapshot, DownloadClientKind, InstanceType};
use culler_core::RemovalRequest;
use culler_engine::{
    DEFAULT_REMOVAL_CAPACITY, EngineState, RemovalReceiver, removal_channel,
};
use culler_events::{Event, EventBus};
use culler_telemetry::Metrics;
use culler_test_support::fixtures::TORRENT_CLIENT;
use culler_test_support::mocks::{FakeDownloadService, FakeQueueProvider, FakeRegistry};

pub struct Harness {
    pub state: EngineState,
    pub bus: EventBus,
    pub provider: Arc<FakeQueueProvider>,
    pub client: Arc<FakeDownloadService>,
    pub receiver: RemovalReceiver,
}

impl Harness {
    pub fn new(snapshot: ConfigSnapshot) -> anyhow::Result<Self> {
        let bus = EventBus::new();
        let metrics = Metrics::new()?;
        let provider = Arc::new(FakeQueueProvider::new(InstanceType::Sonarr));
        let client = Arc::new(FakeDownloadService::new(
            TORRENT_CLIENT,
            DownloadClientKind::QBittorrent,
        ));
        let registry = FakeRegistry::new()
            .with_provider(Arc::clone(&provider))
            .with_service(Arc::clone(&client));
        let (sender, receiver) = removal_channel(DEFAULT_REMOVAL_CAPACITY);
        let state = EngineState::new(
            ConfigService::from_snapshot(snapshot),
            Arc::new(registry),
            Arc::new(bus.clone()),
            metrics,
            sender,
        );
        Ok(Self {
            state,
            bus,
            provider,
            client,
            receiver,
        })
    }

    /// Requests queued so far, without waiting.
    pub fn drain_requests(&mut self) -> Vec<RemovalRequest> {
        let mut requests = Vec::new();
        while let Some(request) = self.receiver.try_recv() {
            requests.push(request);
        }
        requests
    }

    pub fn events(&self) -> Vec<Event> {
        self.bus
            .backlog_since(0)
            .into_iter()
            .map(|envelope| envelope.event)
            .collect()
    }
}
