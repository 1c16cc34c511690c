//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// File system operation failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// JSON document could not be parsed or rendered.
    #[error("invalid json configuration document")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// YAML document could not be parsed or rendered.
    #[error("invalid yaml configuration document")]
    Yaml {
        /// Operation identifier.
        operation: &'static str,
        /// Source serde error.
        source: serde_yaml::Error,
    },
    /// The configuration source does not support the requested operation.
    #[error("configuration operation unsupported")]
    Unsupported {
        /// Operation identifier.
        operation: &'static str,
    },
}

impl ConfigError {
    /// Build an [`ConfigError::InvalidField`] error.
    #[allow(clippy::redundant_pub_crate)]
    pub(crate) fn invalid(
        section: impl Into<String>,
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field: field.into(),
            value,
            reason,
        }
    }

    /// Machine-readable reason when the error is a validation failure.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
