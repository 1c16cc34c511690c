//! POSIX census backed by `stat(2)`: identity is `(st_dev, st_ino)`, the link
//! count is `st_nlink`.

use std::path::Path;

use nix::sys::stat::stat;
use tokio_util::sync::CancellationToken;

use crate::census::{FileIndex, LinkCounter, LinkIdentity, LinkStat};
use crate::error::{FsOpsError, FsOpsResult};

/// Hardlink counter for Unix-like systems.
#[derive(Debug, Default)]
pub struct UnixLinkCounter {
    index: FileIndex,
}

impl UnixLinkCounter {
    /// Create a counter with an empty census.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkCounter for UnixLinkCounter {
    fn populate_file_counts(&self, root: &Path, cancel: &CancellationToken) -> FsOpsResult<usize> {
        self.index.populate(root, cancel, stat_path)
    }

    fn hard_link_count(&self, path: &Path, ignore_root_dir: bool) -> i64 {
        self.index.count(path, ignore_root_dir, stat_path)
    }
}

#[allow(clippy::useless_conversion)]
fn stat_path(path: &Path) -> FsOpsResult<LinkStat> {
    let stat = stat(path).map_err(|source| FsOpsError::nix("census.stat", path, source))?;
    Ok(LinkStat {
        identity: LinkIdentity {
            device: u64::try_from(stat.st_dev).unwrap_or_default(),
            index: u64::try_from(stat.st_ino).unwrap_or_default(),
        },
        links: u64::try_from(stat.st_nlink).unwrap_or_default(),
    })
}
