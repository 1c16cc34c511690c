//! Error types for the remediation engine.

use std::io;
use std::path::PathBuf;

use culler_config::ConfigError;
use culler_core::BackendError;
use culler_fsops::FsOpsError;
use thiserror::Error;

/// Failures while loading or compiling blocklist sources.
#[derive(Debug, Error)]
pub enum BlocklistError {
    /// Reading a local blocklist file failed.
    #[error("blocklist file read failed")]
    Read {
        /// Path of the blocklist file.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Fetching a remote blocklist failed.
    #[error("blocklist fetch failed")]
    Fetch {
        /// URL of the blocklist.
        url: String,
        /// Underlying HTTP error.
        source: reqwest::Error,
    },
    /// A compilation worker panicked or was cancelled.
    #[error("blocklist compilation task failed")]
    Task {
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

/// Primary error type for policy runs and the removal executor.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration snapshot could not be loaded.
    #[error("configuration unavailable")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: ConfigError,
    },
    /// A backend call failed.
    #[error("backend call failed")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// Instance or client name.
        target: String,
        /// Underlying backend error.
        source: BackendError,
    },
    /// Blocklist loading failed.
    #[error("blocklist unavailable")]
    Blocklist {
        /// Underlying blocklist error.
        #[from]
        source: BlocklistError,
    },
    /// Hardlink census failed.
    #[error("hardlink census failed")]
    FsOps {
        /// Underlying filesystem error.
        #[from]
        source: FsOpsError,
    },
    /// A blocking task panicked or was cancelled.
    #[error("engine task failed")]
    Task {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// The removal channel consumer went away.
    #[error("removal channel closed")]
    ChannelClosed,
    /// The run was cancelled.
    #[error("policy run cancelled")]
    Cancelled,
}

impl EngineError {
    #[allow(clippy::redundant_pub_crate)]
    pub(crate) fn backend(
        operation: &'static str,
        target: impl Into<String>,
        source: BackendError,
    ) -> Self {
        Self::Backend {
            operation,
            target: target.into(),
            source,
        }
    }
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn backend_errors_keep_context() {
        let err = EngineError::backend(
            "queue.fetch",
            "sonarr-main",
            BackendError::Unsupported {
                operation: "queue.fetch",
            },
        );
        assert_eq!(err.to_string(), "backend call failed");
        assert!(err.source().is_some());
        assert!(matches!(
            err,
            EngineError::Backend {
                operation: "queue.fetch",
                ..
            }
        ));
    }

    #[test]
    fn blocklist_errors_convert() {
        let err: EngineError = BlocklistError::Read {
            path: PathBuf::from("/missing.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        }
        .into();
        assert!(matches!(err, EngineError::Blocklist { .. }));
        assert_eq!(err.to_string(), "blocklist unavailable");
    }
}
