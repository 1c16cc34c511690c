//! Platform-neutral hardlink census.
//!
//! # Design
//! - A census pass records the identity of every file under an ignored root so
//!   links living there can be subtracted from a file's total link count.
//! - Platform modules only supply `stat`; walking and counting live here.
//! - Counting never fails: any stat failure is reported as `-1`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// Platform identity of a file's data (device/volume plus inode/file index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkIdentity {
    /// Device id or volume serial number.
    pub device: u64,
    /// Inode number or file index.
    pub index: u64,
}

/// Result of a platform stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStat {
    /// Identity shared by every hardlink of the file.
    pub identity: LinkIdentity,
    /// Number of hardlinks reported by the filesystem.
    pub links: u64,
}

/// Capability for counting hardlinks outside an ignored directory.
pub trait LinkCounter: Send + Sync {
    /// Walk `root` and record the identity of every regular file found,
    /// replacing any previously recorded census.
    ///
    /// Returns the number of files recorded.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] when `root` does not exist.
    fn populate_file_counts(&self, root: &Path, cancel: &CancellationToken) -> FsOpsResult<usize>;

    /// Hardlinks of `path` that count as library links.
    ///
    /// Without `ignore_root_dir` the answer is `0` for a single link and `1`
    /// otherwise; with it, links recorded by the last census are subtracted
    /// from the total. Returns `-1` when the file cannot be inspected.
    fn hard_link_count(&self, path: &Path, ignore_root_dir: bool) -> i64;
}

/// Build the counter for the current platform.
#[must_use]
pub fn platform_link_counter() -> Arc<dyn LinkCounter> {
    #[cfg(unix)]
    {
        Arc::new(crate::unix::UnixLinkCounter::new())
    }
    #[cfg(windows)]
    {
        Arc::new(crate::windows::WindowsLinkCounter::new())
    }
}

/// Identity counts recorded by a census pass.
#[derive(Debug, Default)]
pub(crate) struct FileIndex {
    counts: Mutex<HashMap<LinkIdentity, u64>>,
}

impl FileIndex {
    pub(crate) fn populate(
        &self,
        root: &Path,
        cancel: &CancellationToken,
        stat: fn(&Path) -> FsOpsResult<LinkStat>,
    ) -> FsOpsResult<usize> {
        if !root.is_dir() {
            return Err(FsOpsError::InvalidInput {
                field: "root",
                reason: "directory_missing",
                value: Some(root.display().to_string()),
            });
        }

        let mut counts: HashMap<LinkIdentity, u64> = HashMap::new();
        let mut recorded = 0_usize;
        for entry in WalkDir::new(root) {
            if cancel.is_cancelled() {
                debug!(root = %root.display(), "hardlink census cancelled");
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, root = %root.display(), "skipping unreadable census entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match stat(entry.path()) {
                Ok(stat) => {
                    *counts.entry(stat.identity).or_default() += 1;
                    recorded += 1;
                }
                Err(err) => {
                    warn!(error = %err, path = %entry.path().display(), "failed to stat census entry");
                }
            }
        }

        *self.counts.lock().unwrap_or_else(PoisonError::into_inner) = counts;
        debug!(root = %root.display(), files = recorded, "hardlink census populated");
        Ok(recorded)
    }

    pub(crate) fn count(
        &self,
        path: &Path,
        ignore_root_dir: bool,
        stat: fn(&Path) -> FsOpsResult<LinkStat>,
    ) -> i64 {
        let stat = match stat(path) {
            Ok(stat) => stat,
            Err(err) => {
                debug!(error = %err, path = %path.display(), "hardlink stat failed");
                return -1;
            }
        };
        if !ignore_root_dir {
            return i64::from(stat.links > 1);
        }
        let recorded = self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&stat.identity)
            .copied()
            .unwrap_or(0);
        let links = i64::try_from(stat.links).unwrap_or(i64::MAX);
        let recorded = i64::try_from(recorded).unwrap_or(i64::MAX);
        links.saturating_sub(recorded)
    }
}
