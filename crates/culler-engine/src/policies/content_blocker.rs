//! Content blocker: skips unwanted files in torrents and removes torrents
//! left with nothing wanted.

use async_trait::async_trait;
use culler_config::{ArrInstance, ConfigSnapshot, DownloadProtocol, InstanceType};
use culler_core::{DecisionResult, QueueRecord};
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::orchestrator::{Decision, Policy, RunContext};
use crate::rules::ContentRules;

/// Content blocker policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentBlocker;

#[async_trait]
impl Policy for ContentBlocker {
    fn name(&self) -> &'static str {
        "content_blocker"
    }

    fn is_enabled(&self, snapshot: &ConfigSnapshot) -> bool {
        let blocker = &snapshot.content_blocker;
        blocker.enabled
            && InstanceType::ALL
                .into_iter()
                .any(|instance_type| blocker.blocklist(instance_type).enabled)
    }

    fn handles(&self, snapshot: &ConfigSnapshot, instance_type: InstanceType) -> bool {
        snapshot.content_blocker.blocklist(instance_type).enabled
    }

    async fn prepare(&self, ctx: &mut RunContext) -> EngineResult<()> {
        let timeout = ctx.snapshot.general.http_timeout();
        let load = ctx
            .state
            .blocklists
            .load(&ctx.snapshot.content_blocker, timeout);
        ctx.guarded(load).await??;
        Ok(())
    }

    async fn decide(
        &self,
        ctx: &RunContext,
        instance_type: InstanceType,
        instance: &ArrInstance,
        group: &[QueueRecord],
    ) -> EngineResult<Decision> {
        let Some(record) = group.first() else {
            return Ok(Decision::Keep);
        };
        if record.protocol != DownloadProtocol::Torrent {
            return Ok(Decision::Keep);
        }

        let config = &ctx.snapshot.content_blocker;
        let rules = ContentRules::new(config, &ctx.state.blocklists, ctx.dry_run());
        let mut outcome = DecisionResult::not_found();
        for service in ctx.services_supporting(DownloadProtocol::Torrent) {
            let result = ctx
                .guarded(rules.block_unwanted_files(
                    service.as_ref(),
                    instance_type,
                    &record.download_id,
                ))
                .await?;
            match result {
                Ok(decision) if decision.found => {
                    outcome = decision;
                    break;
                }
                Ok(_) => {}
                Err(err) => warn!(
                    client = service.name(),
                    download_id = %record.download_id,
                    error = %err,
                    "content check failed"
                ),
            }
        }

        if !outcome.should_remove {
            debug!(instance = %instance.name, download_id = %record.download_id, "torrent kept");
            return Ok(Decision::Keep);
        }
        Ok(Decision::Remove {
            remove_from_client: !outcome.is_private || config.delete_private,
            reason: outcome.delete_reason,
        })
    }
}
