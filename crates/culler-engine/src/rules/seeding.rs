//! Seeding limits and unlinked detection for the download cleaner.

use std::path::Path;

use culler_config::CleanCategory;
use culler_core::SeedingDownload;
use culler_events::CleanReason;
use culler_fsops::LinkCounter;
use tracing::debug;

/// Why a seeding download has reached its category's limits, if it has.
///
/// Negative limits are disabled. The ratio limit only applies once the
/// minimum seed time is reached.
#[must_use]
pub fn clean_reason(category: &CleanCategory, download: &SeedingDownload) -> Option<CleanReason> {
    let hours = download.seeding_hours();
    if category.max_ratio >= 0.0
        && download.ratio >= category.max_ratio
        && hours >= category.min_seed_time_hours
    {
        return Some(CleanReason::MaxRatioReached);
    }
    if category.max_seed_time_hours >= 0.0 && hours >= category.max_seed_time_hours {
        return Some(CleanReason::MaxSeedTimeReached);
    }
    None
}

/// Whether no non-skipped file of `download` has a hardlink outside the
/// ignored root.
///
/// `None` means the answer is unknown: a file could not be inspected or the
/// download has no files to inspect.
#[must_use]
pub fn unlinked_status(
    counter: &dyn LinkCounter,
    download: &SeedingDownload,
    ignore_root_dir: bool,
) -> Option<bool> {
    let mut inspected = 0_usize;
    let mut linked = false;
    for file in download.files.iter().filter(|file| !file.skipped) {
        let path = Path::new(&download.save_path).join(&file.name);
        let links = counter.hard_link_count(&path, ignore_root_dir);
        if links < 0 {
            debug!(hash = %download.hash, path = %path.display(), "hardlink count unavailable");
            return None;
        }
        inspected += 1;
        linked |= links > 0;
    }
    (inspected > 0).then_some(!linked)
}
