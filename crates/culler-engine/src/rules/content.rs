//! Content blocker rule: skip unwanted files inside a torrent.

use culler_config::{ContentBlockerConfig, InstanceType};
use culler_core::{BackendResult, DecisionResult, DownloadService};
use culler_events::DeleteReason;
use tracing::{debug, info};

use crate::blocklist::BlocklistProvider;

/// Applies the published blocklist of an instance type to a download's files.
pub struct ContentRules<'a> {
    config: &'a ContentBlockerConfig,
    blocklists: &'a BlocklistProvider,
    dry_run: bool,
}

impl<'a> ContentRules<'a> {
    /// Bind the rule to its configuration and the published blocklists.
    #[must_use]
    pub const fn new(
        config: &'a ContentBlockerConfig,
        blocklists: &'a BlocklistProvider,
        dry_run: bool,
    ) -> Self {
        Self {
            config,
            blocklists,
            dry_run,
        }
    }

    /// Mark unwanted files as skipped and report whether the download is left
    /// with nothing worth keeping.
    ///
    /// # Errors
    ///
    /// Propagates client lookup and file skipping failures.
    pub async fn block_unwanted_files(
        &self,
        service: &dyn DownloadService,
        instance_type: InstanceType,
        download_id: &str,
    ) -> BackendResult<DecisionResult> {
        let Some(download) = service.get_download(download_id).await? else {
            return Ok(DecisionResult::not_found());
        };
        if download.is_private && self.config.ignore_private {
            debug!(download_id, "private download ignored");
            return Ok(DecisionResult::keep(true));
        }
        if download.files.is_empty() {
            return Ok(DecisionResult::keep(download.is_private));
        }
        if download.files.iter().all(|file| file.skipped) {
            return Ok(DecisionResult::remove(
                DeleteReason::AllFilesSkipped,
                download.is_private,
            ));
        }

        let blocklist = self.blocklists.snapshot(instance_type);
        let unwanted: Vec<usize> = download
            .files
            .iter()
            .filter(|file| !file.skipped && !blocklist.is_valid(file_name(&file.name)))
            .map(|file| file.index)
            .collect();
        let wanted_left = download
            .files
            .iter()
            .filter(|file| !file.skipped)
            .count()
            .saturating_sub(unwanted.len());

        if wanted_left == 0 {
            info!(download_id, name = %download.name, "every file is blocked");
            return Ok(DecisionResult::remove(
                DeleteReason::AllFilesBlocked,
                download.is_private,
            ));
        }

        if !unwanted.is_empty() {
            if self.dry_run {
                info!(download_id, files = unwanted.len(), "dry run: would skip unwanted files");
            } else {
                service.skip_files(download_id, &unwanted).await?;
                info!(download_id, files = unwanted.len(), "unwanted files skipped");
            }
        }
        Ok(DecisionResult::keep(download.is_private))
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_strips_directories() {
        assert_eq!(file_name("Show/Season 1/sample.mkv"), "sample.mkv");
        assert_eq!(file_name(r"Show\extras\proof.jpg"), "proof.jpg");
        assert_eq!(file_name("movie.mkv"), "movie.mkv");
    }
}
