//! JSON/YAML configuration documents.
//!
//! # Design
//! - Format is chosen from the file extension; anything but `.yaml`/`.yml` is JSON.
//! - Every parsed document is validated before it is handed out.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ConfigSnapshot;
use crate::validate::validate_snapshot;

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl ConfigFormat {
    /// Infer the format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Parse and validate a configuration document.
///
/// # Errors
///
/// Returns an error if the document cannot be deserialized or fails validation.
pub fn parse_document(contents: &str, format: ConfigFormat) -> ConfigResult<ConfigSnapshot> {
    let snapshot: ConfigSnapshot = match format {
        ConfigFormat::Json => serde_json::from_str(contents).map_err(|source| ConfigError::Json {
            operation: "config.parse",
            source,
        })?,
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
            operation: "config.parse",
            source,
        })?,
    };
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// Render a snapshot back into a document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_document(snapshot: &ConfigSnapshot, format: ConfigFormat) -> ConfigResult<String> {
    match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(snapshot).map_err(|source| ConfigError::Json {
                operation: "config.render",
                source,
            })
        }
        ConfigFormat::Yaml => serde_yaml::to_string(snapshot).map_err(|source| ConfigError::Yaml {
            operation: "config.render",
            source,
        }),
    }
}

/// Read, parse, and validate the configuration file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub async fn load_from_path(path: &Path) -> ConfigResult<ConfigSnapshot> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            operation: "config.read",
            path: path.to_path_buf(),
            source,
        })?;
    let format = ConfigFormat::from_path(path);
    debug!(path = %path.display(), ?format, "parsing configuration document");
    parse_document(&contents, format)
}
