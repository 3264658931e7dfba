//! Tracing setup for scripts that drive the reporters.
//!
//! Reporters emit an `info` span per call, `debug` events per column or
//! group, and `trace` events carrying category levels. Levels are patient
//! data: they only reach the log when `log_data` is switched on, and print as
//! [`REDACTED_VALUE`] otherwise.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

static LOG_DATA: AtomicBool = AtomicBool::new(false);

/// Printed in place of a category level while data logging is off.
pub const REDACTED_VALUE: &str = "[REDACTED]";

pub fn log_data_enabled() -> bool {
    LOG_DATA.load(Ordering::Relaxed)
}

/// Allows or forbids category levels in log output.
pub fn set_log_data(enable: bool) {
    LOG_DATA.store(enable, Ordering::Relaxed);
}

/// `value` when data logging is on, [`REDACTED_VALUE`] otherwise.
pub fn redact_value(value: &str) -> &str {
    if log_data_enabled() { value } else { REDACTED_VALUE }
}

/// Subscriber settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for the cohort crates; dependencies stay at `warn`.
    pub level: Level,
    /// One JSON object per event instead of human-readable lines.
    pub json: bool,
    /// Whether category levels may be logged.
    pub log_data: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            log_data: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_json(mut self, enable: bool) -> Self {
        self.json = enable;
        self
    }

    #[must_use]
    pub fn with_log_data(mut self, enable: bool) -> Self {
        self.log_data = enable;
        self
    }
}

/// Installs a global subscriber writing to `writer`.
///
/// `RUST_LOG` overrides the configured level when set.
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already installed.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    set_log_data(config.log_data);
    let builder = fmt()
        .with_env_filter(cohort_filter(config.level))
        .with_writer(writer)
        .without_time();
    if config.json {
        builder.json().finish().try_init()
    } else {
        builder.with_ansi(false).finish().try_init()
    }
}

fn cohort_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "warn,cohort_report={level},cohort_model={level},cohort_stats={level}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = LogConfig::default()
            .with_level(Level::DEBUG)
            .with_json(true)
            .with_log_data(true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json);
        assert!(config.log_data);
        assert!(!LogConfig::default().log_data);
    }

    #[test]
    fn test_redaction_by_default() {
        // Only the logging integration test flips the switch, in its own process.
        assert!(!log_data_enabled());
        assert_eq!(redact_value("alive"), REDACTED_VALUE);
    }
}
