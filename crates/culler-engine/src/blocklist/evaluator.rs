//! Filename evaluation against a compiled blocklist.

use culler_config::BlocklistMode;
use regex::Regex;

use super::BlocklistPattern;

/// Whether `filename` is wanted under `mode`.
///
/// A filename that matches any pattern or regex is unwanted for a blacklist
/// and wanted for a whitelist, so an empty whitelist wants nothing.
#[must_use]
pub fn is_valid(
    filename: &str,
    mode: BlocklistMode,
    patterns: &[BlocklistPattern],
    regexes: &[Regex],
) -> bool {
    if mode == BlocklistMode::Blacklist && patterns.is_empty() && regexes.is_empty() {
        return true;
    }

    let lowered = filename.to_lowercase();
    let matched = patterns.iter().any(|pattern| pattern.matches_lowercase(&lowered))
        || regexes.iter().any(|regex| regex.is_match(filename));

    match mode {
        BlocklistMode::Blacklist => !matched,
        BlocklistMode::Whitelist => matched,
    }
}
