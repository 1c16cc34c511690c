//! Tracing subscriber installation.
//!
//! # Design
//! - One global subscriber per process; the format that won is remembered
//!   so later callers can report it instead of failing blindly.
//! - `RUST_LOG` overrides the configured level when present.

use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Level directive used when neither `RUST_LOG` nor the configuration set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    /// Format used when the configuration leaves it unset: pretty for debug
    /// builds, JSON otherwise.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Resolve an optional configured value, inferring when blank or absent.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::UnknownLogFormat`] for unrecognised names.
    pub fn resolve(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.parse(),
            None => Ok(Self::infer()),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(TelemetryError::UnknownLogFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Subscriber settings, usually taken from the `general` config section.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// `EnvFilter` directive such as `info` or `culler_engine=debug`.
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

impl<'a> LoggingConfig<'a> {
    /// Build settings from the configured level and optional format name.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::UnknownLogFormat`] for unrecognised formats.
    pub fn from_settings(level: &'a str, format: Option<&str>) -> Result<Self> {
        let level = if level.trim().is_empty() {
            DEFAULT_LOG_LEVEL
        } else {
            level
        };
        Ok(Self {
            level,
            format: LogFormat::resolve(format)?,
        })
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInstalled`] when this function already
/// succeeded, and [`TelemetryError::SubscriberInstall`] when another
/// subscriber owns the global slot.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    if let Some(format) = INSTALLED.get() {
        return Err(TelemetryError::AlreadyInstalled { format: *format });
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false))
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })?;

    INSTALLED.set(config.format).ok();
    tracing::debug!(format = ?config.format, level = config.level, "logging installed");
    Ok(())
}

/// Format of the subscriber installed by [`init_logging`], if any.
#[must_use]
pub fn installed_format() -> Option<LogFormat> {
    INSTALLED.get().copied()
}
