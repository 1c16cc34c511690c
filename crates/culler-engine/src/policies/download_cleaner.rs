//! Download cleaner: reclassifies unlinked seeding downloads and deletes
//! downloads that reached their category's seeding limits.
//!
//! # Design
//! - Queue processing only records which downloads are still tracked by a
//!   provider, valid or not; those are never touched.
//! - Unlinked handling runs before cleaning. Category creation and census
//!   failures abort the run; individual moves are best effort.
//! - A failing client is logged and skipped while collecting and cleaning.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use culler_config::{ArrInstance, ConfigSnapshot, DownloadCleanerConfig, InstanceType};
use culler_core::{DownloadService, QueueRecord, SeedingDownload};
use culler_events::Event;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::orchestrator::{Decision, Policy, RunContext};
use crate::rules::{clean_reason, unlinked_status};

/// Download cleaner policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadCleaner;

#[async_trait]
impl Policy for DownloadCleaner {
    fn name(&self) -> &'static str {
        "download_cleaner"
    }

    fn is_enabled(&self, snapshot: &ConfigSnapshot) -> bool {
        let cleaner = &snapshot.download_cleaner;
        cleaner.enabled && (cleaner.cleaning_enabled() || cleaner.unlinked_enabled())
    }

    fn observe(&self, ctx: &RunContext, group: &[QueueRecord]) {
        for record in group {
            ctx.exclude(&record.download_id);
        }
    }

    async fn decide(
        &self,
        _ctx: &RunContext,
        _instance_type: InstanceType,
        _instance: &ArrInstance,
        _group: &[QueueRecord],
    ) -> EngineResult<Decision> {
        Ok(Decision::Keep)
    }

    async fn on_queue_drained(&self, ctx: &RunContext) -> EngineResult<()> {
        let config = &ctx.snapshot.download_cleaner;
        let mut candidates = collect_candidates(ctx).await?;
        if candidates.is_empty() {
            debug!("no seeding downloads to clean");
            return Ok(());
        }

        if config.unlinked_enabled() {
            let changed = change_unlinked_categories(ctx, config, &mut candidates).await?;
            if changed > 0 && !config.settle_delay().is_zero() {
                ctx.guarded(tokio::time::sleep(config.settle_delay())).await?;
            }
        }

        if config.cleaning_enabled() {
            clean_downloads(ctx, config, &candidates).await?;
        }
        Ok(())
    }

    fn fail_fast(&self) -> bool {
        true
    }
}

type Candidate = (Arc<dyn DownloadService>, SeedingDownload);

async fn collect_candidates(ctx: &RunContext) -> EngineResult<Vec<Candidate>> {
    let mut candidates = Vec::new();
    for service in &ctx.services {
        let downloads = match ctx.guarded(service.get_seeding_downloads()).await? {
            Ok(downloads) => downloads,
            Err(err) => {
                warn!(client = service.name(), error = %err, "seeding downloads unavailable");
                continue;
            }
        };
        for download in downloads {
            if ctx.is_excluded(&download.hash) {
                debug!(hash = %download.hash, "download still tracked by a queue");
                continue;
            }
            if ctx.ignored.matches_seeding(&download) {
                info!(hash = %download.hash, name = %download.name, "download ignored");
                continue;
            }
            candidates.push((Arc::clone(service), download));
        }
    }
    Ok(candidates)
}

async fn change_unlinked_categories(
    ctx: &RunContext,
    config: &DownloadCleanerConfig,
    candidates: &mut [Candidate],
) -> EngineResult<usize> {
    let Some(target) = config.unlinked_target_category.as_deref().map(str::trim) else {
        return Ok(0);
    };
    let dry_run = ctx.dry_run();

    if !config.unlinked_use_tag {
        for service in &ctx.services {
            if dry_run {
                info!(client = service.name(), category = target, "dry run: would create category");
                continue;
            }
            ctx.guarded(service.create_category(target))
                .await?
                .map_err(|err| EngineError::backend("download.create_category", service.name(), err))?;
        }
    }

    let ignore_root = config
        .unlinked_ignored_root_dir
        .as_deref()
        .map(str::trim)
        .filter(|root| !root.is_empty())
        .map(PathBuf::from);
    if let Some(root) = ignore_root.clone() {
        let counter = Arc::clone(&ctx.state.link_counter);
        let cancel = ctx.cancel.clone();
        let recorded = tokio::task::spawn_blocking(move || counter.populate_file_counts(&root, &cancel))
            .await
            .map_err(|source| EngineError::Task {
                operation: "census.populate",
                source,
            })??;
        debug!(files = recorded, "hardlink census populated");
    }
    if ctx.cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let mut changed = 0;
    for (service, download) in candidates {
        let Some(category) = download.category.clone() else {
            continue;
        };
        let in_scope = config
            .unlinked_categories
            .iter()
            .any(|source| source.eq_ignore_ascii_case(&category));
        if !in_scope {
            continue;
        }
        if unlinked_status(ctx.state.link_counter.as_ref(), download, ignore_root.is_some()) != Some(true) {
            continue;
        }

        if dry_run {
            info!(hash = %download.hash, from = %category, to = target, "dry run: would reclassify unlinked download");
            reclassify(download, target, config.unlinked_use_tag);
            continue;
        }

        let moved = if config.unlinked_use_tag {
            ctx.guarded(service.add_tag(&download.hash, target)).await?
        } else {
            ctx.guarded(service.change_category(&download.hash, target))
                .await?
        };
        if let Err(err) = moved {
            warn!(client = service.name(), hash = %download.hash, error = %err, "reclassification failed");
            continue;
        }
        info!(hash = %download.hash, from = %category, to = target, "unlinked download reclassified");
        reclassify(download, target, config.unlinked_use_tag);
        changed += 1;

        ctx.state.metrics.inc_category_changed();
        if let Err(err) = ctx.state.events.emit(Event::CategoryChanged {
            client: service.name().to_string(),
            hash: download.hash.clone(),
            name: download.name.clone(),
            from: category,
            to: target.to_string(),
            is_tag: config.unlinked_use_tag,
        }) {
            warn!(error = %err, "failed to publish category change");
        }
    }
    Ok(changed)
}

fn reclassify(download: &mut SeedingDownload, target: &str, use_tag: bool) {
    if use_tag {
        download.tags.push(target.to_string());
    } else {
        download.category = Some(target.to_string());
    }
}

async fn clean_downloads(
    ctx: &RunContext,
    config: &DownloadCleanerConfig,
    candidates: &[Candidate],
) -> EngineResult<()> {
    for (service, download) in candidates {
        let Some(category) = download.category.as_deref() else {
            continue;
        };
        let Some(rule) = config
            .categories
            .iter()
            .find(|rule| rule.name.eq_ignore_ascii_case(category))
        else {
            continue;
        };
        if download.is_private && !config.delete_private {
            debug!(hash = %download.hash, "private download kept");
            continue;
        }
        let Some(reason) = clean_reason(rule, download) else {
            continue;
        };

        if ctx.dry_run() {
            info!(hash = %download.hash, name = %download.name, reason = reason.as_str(), "dry run: would delete download");
            continue;
        }
        if let Err(err) = ctx
            .guarded(service.delete_download(&download.hash, true))
            .await?
        {
            warn!(client = service.name(), hash = %download.hash, error = %err, "download deletion failed");
            continue;
        }
        info!(
            client = service.name(),
            hash = %download.hash,
            name = %download.name,
            reason = reason.as_str(),
            ratio = download.ratio,
            "download cleaned"
        );

        ctx.state.metrics.inc_download_cleaned(reason.as_str());
        if let Err(err) = ctx.state.events.emit(Event::DownloadCleaned {
            client: service.name().to_string(),
            hash: download.hash.clone(),
            name: download.name.clone(),
            category: category.to_string(),
            reason,
            ratio: download.ratio,
            seeding_seconds: download.seeding_time_secs,
        }) {
            warn!(error = %err, "failed to publish download cleaned event");
        }
    }
    Ok(())
}
