//! Windows census backed by `GetFileInformationByHandle`: identity is the
//! volume serial number plus file index, the link count is `nNumberOfLinks`.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use winapi_util::{Handle, file};

use crate::census::{FileIndex, LinkCounter, LinkIdentity, LinkStat};
use crate::error::{FsOpsError, FsOpsResult};

/// Hardlink counter for Windows volumes.
#[derive(Debug, Default)]
pub struct WindowsLinkCounter {
    index: FileIndex,
}

impl WindowsLinkCounter {
    /// Create a counter with an empty census.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkCounter for WindowsLinkCounter {
    fn populate_file_counts(&self, root: &Path, cancel: &CancellationToken) -> FsOpsResult<usize> {
        self.index.populate(root, cancel, stat_path)
    }

    fn hard_link_count(&self, path: &Path, ignore_root_dir: bool) -> i64 {
        self.index.count(path, ignore_root_dir, stat_path)
    }
}

fn stat_path(path: &Path) -> FsOpsResult<LinkStat> {
    let handle =
        Handle::from_path_any(path).map_err(|source| FsOpsError::io("census.open", path, source))?;
    let info =
        file::information(&handle).map_err(|source| FsOpsError::io("census.stat", path, source))?;
    Ok(LinkStat {
        identity: LinkIdentity {
            device: info.volume_serial_number(),
            index: info.file_index(),
        },
        links: info.number_of_links(),
    })
}
