//! Census errors. Messages are constant; the operation and path travel as
//! fields.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for census operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by the hardlink census.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// A file could not be opened or queried.
    #[error("census io failure")]
    Io {
        /// Census step, e.g. `census.stat`.
        operation: &'static str,
        /// File being inspected.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The census was pointed at something it cannot walk.
    #[error("census input rejected")]
    InvalidInput {
        /// Argument name.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Rejected value.
        value: Option<String>,
    },
    /// `stat(2)` failed.
    #[cfg(unix)]
    #[error("census stat failure")]
    Nix {
        /// Census step.
        operation: &'static str,
        /// File being inspected.
        path: PathBuf,
        /// Underlying errno.
        source: nix::Error,
    },
}

impl FsOpsError {
    #[cfg_attr(unix, allow(dead_code))]
    #[allow(clippy::redundant_pub_crate)]
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[cfg(unix)]
    #[allow(clippy::redundant_pub_crate)]
    pub(crate) fn nix(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: nix::Error,
    ) -> Self {
        Self::Nix {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_failures_keep_path_and_source() {
        let err = FsOpsError::io("census.open", "/data/file.mkv", io::Error::other("denied"));
        assert!(matches!(&err, FsOpsError::Io { path, .. } if path.ends_with("file.mkv")));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "census io failure");

        let invalid = FsOpsError::InvalidInput {
            field: "root",
            reason: "not_a_directory",
            value: None,
        };
        assert!(invalid.source().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn nix_helper_keeps_source() {
        let err = FsOpsError::nix("census.stat", "/missing", nix::Error::ENOENT);
        assert!(err.source().is_some());
    }
}
