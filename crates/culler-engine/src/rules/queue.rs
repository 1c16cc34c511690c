//! Queue cleaner rules evaluated against the download client's view.
//!
//! # Design
//! - Checks run in a fixed order: all files skipped, stalled, stuck on
//!   metadata, slow speed, slow time. The first that fires wins.
//! - Progress is sampled once per evaluation so the stalled and slow checks
//!   agree on whether the download moved.
//! - Private downloads are skipped per rule when its `ignore_private` flag is
//!   set.

use culler_config::QueueCleanerConfig;
use culler_core::{
    BackendResult, DecisionResult, DownloadService, DownloadSnapshot, DownloadState,
};
use culler_events::{DeleteReason, StrikeKind};
use tracing::debug;

use crate::strikes::{ProgressTracker, StrikeLedger};

/// Evaluates stalled, metadata, slow, and skipped-file rules.
pub struct QueueRules<'a> {
    config: &'a QueueCleanerConfig,
    strikes: &'a StrikeLedger,
    progress: &'a ProgressTracker,
}

impl<'a> QueueRules<'a> {
    /// Bind the rules to a configuration snapshot and the shared ledgers.
    #[must_use]
    pub const fn new(
        config: &'a QueueCleanerConfig,
        strikes: &'a StrikeLedger,
        progress: &'a ProgressTracker,
    ) -> Self {
        Self {
            config,
            strikes,
            progress,
        }
    }

    /// Ask `service` about `download_id` and decide whether the queue item
    /// should go.
    ///
    /// # Errors
    ///
    /// Propagates the client lookup failure.
    pub async fn should_remove_from_arr_queue(
        &self,
        service: &dyn DownloadService,
        download_id: &str,
    ) -> BackendResult<DecisionResult> {
        let Some(snapshot) = service.get_download(download_id).await? else {
            return Ok(DecisionResult::not_found());
        };
        Ok(self.evaluate(&snapshot))
    }

    /// Decide for a download the client already reported.
    #[must_use]
    pub fn evaluate(&self, download: &DownloadSnapshot) -> DecisionResult {
        if !download.files.is_empty() && download.files.iter().all(|file| file.skipped) {
            debug!(download_id = %download.hash, "every file is skipped");
            return DecisionResult::remove(DeleteReason::AllFilesSkipped, download.is_private);
        }

        let progressed = self
            .progress
            .has_progressed(&download.hash, download.downloaded_bytes);

        let reason = match download.state {
            DownloadState::Stalled => self.check_stalled(download, progressed),
            DownloadState::DownloadingMetadata => self.check_metadata(download),
            DownloadState::Downloading => self.check_slow(download, progressed),
            _ => None,
        };

        reason.map_or_else(
            || DecisionResult::keep(download.is_private),
            |reason| DecisionResult::remove(reason, download.is_private),
        )
    }

    fn check_stalled(&self, download: &DownloadSnapshot, progressed: bool) -> Option<DeleteReason> {
        let stalled = &self.config.stalled;
        if stalled.max_strikes == 0 || (download.is_private && stalled.ignore_private) {
            return None;
        }
        if stalled.reset_strikes_on_progress && progressed {
            self.strikes.reset(&download.hash, StrikeKind::Stalled);
            return None;
        }
        self.strike(download, stalled.max_strikes, StrikeKind::Stalled)
    }

    fn check_metadata(&self, download: &DownloadSnapshot) -> Option<DeleteReason> {
        let stalled = &self.config.stalled;
        if download.is_private && stalled.ignore_private {
            return None;
        }
        self.strike(
            download,
            stalled.downloading_metadata_max_strikes,
            StrikeKind::DownloadingMetadata,
        )
    }

    fn check_slow(&self, download: &DownloadSnapshot, progressed: bool) -> Option<DeleteReason> {
        let slow = &self.config.slow;
        if slow.max_strikes == 0 || (download.is_private && slow.ignore_private) {
            return None;
        }
        if slow
            .ignore_above_size_bytes
            .is_some_and(|limit| limit > 0 && download.total_size > limit)
        {
            return None;
        }
        if slow.reset_strikes_on_progress && progressed {
            self.strikes.reset(&download.hash, StrikeKind::SlowSpeed);
            self.strikes.reset(&download.hash, StrikeKind::SlowTime);
        }

        if slow.min_speed_bps > 0 && download.download_speed_bps < slow.min_speed_bps {
            return self.strike(download, slow.max_strikes, StrikeKind::SlowSpeed);
        }

        if slow.max_time_hours > 0.0
            && let Some(eta) = download.eta_secs
            && eta_exceeds(eta, slow.max_time_hours)
        {
            return self.strike(download, slow.max_strikes, StrikeKind::SlowTime);
        }
        None
    }

    fn strike(
        &self,
        download: &DownloadSnapshot,
        max_strikes: u32,
        kind: StrikeKind,
    ) -> Option<DeleteReason> {
        self.strikes
            .strike_and_check_limit(&download.hash, &download.name, max_strikes, kind)
            .then(|| DeleteReason::from(kind))
    }
}

#[allow(clippy::cast_precision_loss)]
fn eta_exceeds(eta_secs: u64, max_time_hours: f64) -> bool {
    eta_secs as f64 > max_time_hours * 3_600.0
}
