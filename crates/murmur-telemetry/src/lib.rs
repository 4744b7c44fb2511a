//! # Murmur Telemetry
//!
//! Observability for the Murmur node: env-filtered structured logging
//! (plain or JSON) and Prometheus counters for the feeds pipeline.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use murmur_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("telemetry init");
//! ```

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};
pub use metrics::{
    gather, register_metrics, MetricsHandle, CACHE_WRITE_FAILURES, FEEDS_CREATED,
    KEY_ROTATIONS_COMPLETED, KEY_ROTATIONS_FAILED, MESSAGES_STORED, TRANSACTIONS_INDEXED,
    VALIDATIONS_REJECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Subscriber installation failed
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration failed
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Guard that keeps telemetry active for the process lifetime.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
    _metrics: MetricsHandle,
}

/// Initialize logging and metrics in one call.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let logging = init_logging(config)?;
    Ok(TelemetryGuard {
        _logging: logging,
        _metrics: metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("duplicate".to_string());
        assert!(err.to_string().contains("duplicate"));
    }
}
