//! Structured logging setup over `tracing-subscriber`.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, EnvFilter};

/// Guard returned by [`init_logging`]; keep it alive for the process
/// lifetime.
pub struct LoggingGuard {
    _private: (),
}

/// Install the global subscriber: env-filtered, human-readable by
/// default, JSON when configured (containers).
///
/// Calling this twice returns an error from the underlying subscriber;
/// tests that race initialization should treat that as already-done.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    let result = if config.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    Ok(LoggingGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_init_errors_cleanly() {
        let config = TelemetryConfig::default();
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Exactly one of them installed the subscriber.
        assert!(first.is_ok() || second.is_err());
    }
}
