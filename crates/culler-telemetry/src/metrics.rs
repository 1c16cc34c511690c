//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges relevant to remediation runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across policies.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    strikes_total: IntCounterVec,
    removals_requested_total: IntCounterVec,
    downloads_cleaned_total: IntCounterVec,
    categories_changed_total: IntCounter,
    policy_runs_total: IntCounterVec,
    blocklist_entries: IntGaugeVec,
    strikes_seen: AtomicU64,
    removals_seen: AtomicU64,
    cleaned_seen: AtomicU64,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total strikes recorded across all kinds.
    pub strikes_total: u64,
    /// Total removal requests emitted across all reasons.
    pub removals_requested_total: u64,
    /// Total seeding downloads deleted.
    pub downloads_cleaned_total: u64,
    /// Total downloads moved into the unlinked category.
    pub categories_changed_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let strikes_total = counter_vec(
            "strikes_total",
            "Strikes recorded against downloads by kind",
            &["kind"],
        )?;
        let removals_requested_total = counter_vec(
            "removals_requested_total",
            "Queue item removal requests emitted by reason",
            &["reason"],
        )?;
        let downloads_cleaned_total = counter_vec(
            "downloads_cleaned_total",
            "Seeding downloads deleted by reason",
            &["reason"],
        )?;
        let categories_changed_total = IntCounter::with_opts(Opts::new(
            "categories_changed_total",
            "Downloads moved into the unlinked category",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "categories_changed_total",
            source,
        })?;
        let policy_runs_total = counter_vec(
            "policy_runs_total",
            "Policy runs by policy and outcome",
            &["policy", "outcome"],
        )?;
        let blocklist_entries = IntGaugeVec::new(
            Opts::new(
                "blocklist_entries",
                "Compiled blocklist entries by queue provider type",
            ),
            &["instance_type"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "blocklist_entries",
            source,
        })?;

        register(&registry, "strikes_total", &strikes_total)?;
        register(
            &registry,
            "removals_requested_total",
            &removals_requested_total,
        )?;
        register(&registry, "downloads_cleaned_total", &downloads_cleaned_total)?;
        register(
            &registry,
            "categories_changed_total",
            &categories_changed_total,
        )?;
        register(&registry, "policy_runs_total", &policy_runs_total)?;
        register(&registry, "blocklist_entries", &blocklist_entries)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                strikes_total,
                removals_requested_total,
                downloads_cleaned_total,
                categories_changed_total,
                policy_runs_total,
                blocklist_entries,
                strikes_seen: AtomicU64::new(0),
                removals_seen: AtomicU64::new(0),
                cleaned_seen: AtomicU64::new(0),
            }),
        })
    }

    /// Increment the strike counter for the given kind.
    pub fn inc_strike(&self, kind: &str) {
        self.inner.strikes_total.with_label_values(&[kind]).inc();
        self.inner.strikes_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the removal request counter for the given reason.
    pub fn inc_removal_requested(&self, reason: &str) {
        self.inner
            .removals_requested_total
            .with_label_values(&[reason])
            .inc();
        self.inner.removals_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the cleaned download counter for the given reason.
    pub fn inc_download_cleaned(&self, reason: &str) {
        self.inner
            .downloads_cleaned_total
            .with_label_values(&[reason])
            .inc();
        self.inner.cleaned_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the unlinked category change counter.
    pub fn inc_category_changed(&self) {
        self.inner.categories_changed_total.inc();
    }

    /// Record the outcome (`completed`/`failed`) of a policy run.
    pub fn inc_policy_run(&self, policy: &str, outcome: &str) {
        self.inner
            .policy_runs_total
            .with_label_values(&[policy, outcome])
            .inc();
    }

    /// Set the number of compiled blocklist entries for a queue provider type.
    pub fn set_blocklist_entries(&self, instance_type: &str, count: usize) {
        self.inner
            .blocklist_entries
            .with_label_values(&[instance_type])
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the remediation counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            strikes_total: self.inner.strikes_seen.load(Ordering::Relaxed),
            removals_requested_total: self.inner.removals_seen.load(Ordering::Relaxed),
            downloads_cleaned_total: self.inner.cleaned_seen.load(Ordering::Relaxed),
            categories_changed_total: self.inner.categories_changed_total.get(),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
