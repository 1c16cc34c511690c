//! Failed-import strike rule evaluated on the provider's own record.

use culler_config::FailedImportConfig;
use culler_core::QueueRecord;
use culler_events::StrikeKind;
use tracing::debug;

use crate::strikes::StrikeLedger;

const IMPORT_STATES: [&str; 3] = ["importpending", "importfailed", "importblocked"];

/// Whether a record stuck on import has used up its strikes.
///
/// Only records flagged `warning` in an import state are struck. Records
/// whose status messages contain any ignored pattern are left alone.
#[must_use]
pub fn should_remove_from_queue(
    config: &FailedImportConfig,
    strikes: &StrikeLedger,
    record: &QueueRecord,
    is_private: bool,
) -> bool {
    if config.max_strikes == 0 || (is_private && config.ignore_private) {
        return false;
    }
    if !record.tracked_download_status.eq_ignore_ascii_case("warning") {
        return false;
    }
    let state = record.tracked_download_state.to_ascii_lowercase();
    if !IMPORT_STATES.contains(&state.as_str()) {
        return false;
    }

    let ignored = config
        .ignored_patterns
        .iter()
        .map(|pattern| pattern.trim())
        .filter(|pattern| !pattern.is_empty())
        .find(|pattern| {
            record
                .message_lines()
                .chain(record.status_messages.iter().map(|m| m.title.as_str()))
                .any(|line| line.contains(pattern))
        });
    if let Some(pattern) = ignored {
        debug!(download_id = %record.download_id, pattern, "import failure matches an ignored pattern");
        return false;
    }

    strikes.strike_and_check_limit(
        &record.download_id,
        &record.title,
        config.max_strikes,
        StrikeKind::FailedImport,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use culler_core::StatusMessage;
    use culler_events::EventBus;
    use culler_telemetry::Metrics;

    fn ledger() -> StrikeLedger {
        let metrics = Metrics::new().unwrap_or_else(|err| panic!("metrics: {err}"));
        StrikeLedger::new(Duration::from_secs(60), Arc::new(EventBus::new()), metrics)
    }

    fn record(status: &str, state: &str, message: &str) -> QueueRecord {
        QueueRecord {
            download_id: "abc".into(),
            title: "Movie.2024".into(),
            tracked_download_status: status.into(),
            tracked_download_state: state.into(),
            status_messages: vec![StatusMessage {
                title: "Movie.2024".into(),
                messages: vec![message.into()],
            }],
            ..QueueRecord::default()
        }
    }

    fn config() -> FailedImportConfig {
        FailedImportConfig {
            max_strikes: 2,
            ignored_patterns: vec!["title mismatch".into()],
            ..FailedImportConfig::default()
        }
    }

    #[tokio::test]
    async fn warning_in_import_state_is_struck() {
        let strikes = ledger();
        let config = config();
        let stuck = record("Warning", "importBlocked", "No files found");
        assert!(!should_remove_from_queue(&config, &strikes, &stuck, false));
        assert!(should_remove_from_queue(&config, &strikes, &stuck, false));
    }

    #[tokio::test]
    async fn other_states_and_ignored_messages_are_skipped() {
        let strikes = ledger();
        let config = config();
        let downloading = record("warning", "downloading", "");
        let healthy = record("ok", "importPending", "");
        let ignored = record("warning", "importFailed", "Possible title mismatch here");
        for candidate in [&downloading, &healthy, &ignored] {
            for _ in 0..3 {
                assert!(!should_remove_from_queue(&config, &strikes, candidate, false));
            }
        }
        assert_eq!(strikes.count("abc", StrikeKind::FailedImport), 0);
    }

    #[tokio::test]
    async fn private_records_respect_ignore_private() {
        let strikes = ledger();
        let config = FailedImportConfig {
            max_strikes: 1,
            ignore_private: true,
            ..FailedImportConfig::default()
        };
        let stuck = record("warning", "importPending", "");
        assert!(!should_remove_from_queue(&config, &strikes, &stuck, true));
        assert!(should_remove_from_queue(&config, &strikes, &stuck, false));
    }
}
