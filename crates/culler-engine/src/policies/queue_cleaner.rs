//! Queue cleaner: removes stalled, slow, metadata-stuck, fully skipped, and
//! failed-import queue items.

use async_trait::async_trait;
use culler_config::{ArrInstance, ConfigSnapshot, InstanceType};
use culler_core::{DecisionResult, QueueRecord};
use culler_events::DeleteReason;
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::orchestrator::{Decision, Policy, RunContext};
use crate::rules::{QueueRules, should_remove_from_queue};

/// Queue cleaner policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueCleaner;

/// Ask each client serving the record's protocol until one knows it.
async fn client_decision(ctx: &RunContext, record: &QueueRecord) -> EngineResult<DecisionResult> {
    let rules = QueueRules::new(
        &ctx.snapshot.queue_cleaner,
        &ctx.state.strikes,
        &ctx.state.progress,
    );
    for service in ctx.services_supporting(record.protocol) {
        let lookup = ctx
            .guarded(rules.should_remove_from_arr_queue(service.as_ref(), &record.download_id))
            .await?;
        match lookup {
            Ok(decision) if decision.found => return Ok(decision),
            Ok(_) => {}
            Err(err) => warn!(
                client = service.name(),
                download_id = %record.download_id,
                error = %err,
                "download lookup failed"
            ),
        }
    }
    Ok(DecisionResult::not_found())
}

#[async_trait]
impl Policy for QueueCleaner {
    fn name(&self) -> &'static str {
        "queue_cleaner"
    }

    fn is_enabled(&self, snapshot: &ConfigSnapshot) -> bool {
        snapshot.queue_cleaner.enabled
    }

    async fn decide(
        &self,
        ctx: &RunContext,
        _instance_type: InstanceType,
        instance: &ArrInstance,
        group: &[QueueRecord],
    ) -> EngineResult<Decision> {
        let Some(record) = group.first() else {
            return Ok(Decision::Keep);
        };

        let client = client_decision(ctx, record).await?;
        let reason = if client.should_remove {
            client.delete_reason
        } else if should_remove_from_queue(
            &ctx.snapshot.queue_cleaner.failed_import,
            &ctx.state.strikes,
            record,
            client.is_private,
        ) {
            DeleteReason::FailedImport
        } else {
            debug!(instance = %instance.name, download_id = %record.download_id, "queue item kept");
            return Ok(Decision::Keep);
        };

        Ok(Decision::Remove {
            remove_from_client: !client.is_private || delete_private(ctx.snapshot.as_ref(), reason),
            reason,
        })
    }
}

/// Whether private-tracker data may be deleted for a removal with `reason`.
const fn delete_private(snapshot: &ConfigSnapshot, reason: DeleteReason) -> bool {
    let cleaner = &snapshot.queue_cleaner;
    match reason {
        DeleteReason::Stalled | DeleteReason::DownloadingMetadata => cleaner.stalled.delete_private,
        DeleteReason::SlowSpeed | DeleteReason::SlowTime => cleaner.slow.delete_private,
        DeleteReason::FailedImport => cleaner.failed_import.delete_private,
        DeleteReason::AllFilesSkipped | DeleteReason::AllFilesBlocked => {
            snapshot.content_blocker.delete_private
        }
        DeleteReason::None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_deletion_follows_the_rule_that_fired() {
        let mut snapshot = ConfigSnapshot::default();
        snapshot.queue_cleaner.slow.delete_private = true;
        snapshot.content_blocker.delete_private = true;
        assert!(!delete_private(&snapshot, DeleteReason::Stalled));
        assert!(!delete_private(&snapshot, DeleteReason::DownloadingMetadata));
        assert!(delete_private(&snapshot, DeleteReason::SlowTime));
        assert!(delete_private(&snapshot, DeleteReason::AllFilesSkipped));
        assert!(!delete_private(&snapshot, DeleteReason::FailedImport));
        assert!(!delete_private(&snapshot, DeleteReason::None));
    }
}
