//! Structured logging for daemons that serve the protocol.
//!
//! Logs always go to standard error: standard output may be the control
//! channel.

use std::io::{self, IsTerminal};

use netspec_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

const TELEMETRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::telemetry");

/// Format of the installed subscriber, set by the first successful call.
static TELEMETRY_GUARD: OnceCell<LogFormat> = OnceCell::new();

/// Describes the subscriber serving this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Returns the format chosen by the call that installed the subscriber.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected filter expression.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the process-wide tracing subscriber.
///
/// A daemon calls this once, after its settings load and before it opens the
/// channel. Only the first call installs anything. Later calls, such as those
/// made by tests that launch several daemons in one process, get a handle
/// reporting the format that is actually in effect; a differing requested
/// format is logged at debug level and otherwise ignored.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the filter does not parse or a subscriber
/// not installed here already owns the process.
///
/// # Examples
///
/// ```rust
/// use netspec::telemetry;
/// use netspec_config::Config;
///
/// # fn main() -> Result<(), netspec::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// assert_eq!(first, second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let format = *TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config).map(|()| config.log_format()))?;
    if format != config.log_format() {
        debug!(
            target: TELEMETRY_TARGET,
            active = %format,
            requested = %config.log_format(),
            "telemetry already installed; keeping the active format"
        );
    }
    Ok(TelemetryHandle { format })
}

fn env_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        message: error.to_string(),
    })
}

/// Builds the subscriber for `config`.
///
/// Events are written to standard error only. With `--netspec -` standard
/// output carries acknowledgement frames, and a stray log line there would
/// corrupt the framing. Colour is used only for compact output on a terminal
/// so JSON lines stay machine-readable.
fn subscriber(config: &Config) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let format = config.log_format();
    let colour = format == LogFormat::Compact && io::stderr().is_terminal();
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter(config)?)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_ansi(colour)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };
    Ok(subscriber)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    tracing::subscriber::set_global_default(subscriber(config)?)
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("info")]
    #[case("netspec::engine=debug,warn")]
    fn valid_filters_are_accepted(#[case] filter: &str) {
        let config = Config::default().with_log_filter(filter);
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn invalid_filter_is_reported_with_its_text() {
        let config = Config::default().with_log_filter("netspec=loud");
        let error = env_filter(&config).expect_err("filter rejected");
        assert!(error.to_string().starts_with("invalid log filter 'netspec=loud'"));
    }

    #[test]
    fn later_calls_report_the_installed_format() {
        let first = initialise(&Config::default().with_log_format(LogFormat::Compact))
            .expect("subscriber installed");
        let second = initialise(&Config::default().with_log_format(LogFormat::Json))
            .expect("subscriber reused");
        assert_eq!(second.format(), first.format());
    }
}
