//! Error types for queue provider and download client backends.

use std::error::Error;

use thiserror::Error;

/// Primary error type for backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Operation is not supported by the backend.
    #[error("backend operation not supported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
    /// Backend rejected the configured credentials.
    #[error("backend authentication failed")]
    Unauthorized {
        /// Instance or client name.
        target: String,
    },
    /// No backend is registered for the requested kind.
    #[error("backend not registered")]
    NotRegistered {
        /// Requested backend kind.
        kind: String,
    },
    /// Operation failed in the backend.
    #[error("backend operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Instance or client name.
        target: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BackendError {
    /// Wrap an underlying failure with operation context.
    pub fn failed(
        operation: &'static str,
        target: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::OperationFailed {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Convenience alias for backend operation results.
pub type BackendResult<T> = Result<T, BackendError>;
