//! Error types for logging and metrics setup.

use prometheus::Error as PrometheusError;
use thiserror::Error;

use crate::init::LogFormat;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing logging or building metrics.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured log format is not one of `json`, `pretty`, `compact`.
    #[error("unknown log format")]
    UnknownLogFormat {
        /// Value as configured.
        value: String,
    },
    /// Logging was already installed by this crate.
    #[error("logging already installed")]
    AlreadyInstalled {
        /// Format of the installed subscriber.
        format: LogFormat,
    },
    /// Another global subscriber is already set.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A Prometheus collector could not be built.
    #[error("failed to build metrics collector")]
    MetricsCollector {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// A Prometheus collector could not be registered.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The registry could not be encoded.
    #[error("failed to encode metrics")]
    MetricsEncode {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// Encoded metrics were not valid UTF-8.
    #[error("metrics output was not valid utf-8")]
    MetricsUtf8 {
        /// Underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}
