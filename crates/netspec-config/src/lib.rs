//! Shared configuration for netspec daemons.
//!
//! Settings are resolved from command-line flags, then `NETSPEC_*`
//! environment variables, then built-in defaults. The `--netspec` channel
//! flag is not handled here; binaries strip it before loading configuration.

mod defaults;
mod logging;

use std::ffi::OsString;

use clap::Parser;
use thiserror::Error;

pub use defaults::{DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, default_log_format};
pub use logging::{LogFormat, LogFormatParseError};

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "NETSPEC_LOG_FILTER";
/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "NETSPEC_LOG_FORMAT";
/// Environment variable overriding the frame size limit.
pub const MAX_FRAME_BYTES_ENV: &str = "NETSPEC_MAX_FRAME_BYTES";

/// Runtime settings shared by netspec daemons.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(about = "Daemon driven over a netspec control channel", long_about = None)]
pub struct Config {
    /// Tracing filter directives, for example `info` or `netspec=debug`.
    #[arg(long, env = LOG_FILTER_ENV, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Log output format (`json` or `compact`).
    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = default_log_format())]
    log_format: LogFormat,

    /// Largest control frame payload accepted, in bytes.
    #[arg(
        long,
        env = MAX_FRAME_BYTES_ENV,
        default_value_t = DEFAULT_MAX_FRAME_BYTES,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_frame_bytes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The arguments or environment held an invalid setting, or help or
    /// version output was requested.
    #[error(transparent)]
    Arguments(#[from] clap::Error),
}

impl ConfigError {
    /// Returns `true` when the error only carries help or version text
    /// rather than a real failure.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        match self {
            Self::Arguments(error) => matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ),
        }
    }
}

impl Config {
    /// Resolves configuration from an argument list and the process
    /// environment. The first argument is the program name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Arguments`] for unknown flags, malformed
    /// values, or help and version requests.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::try_parse_from(args)?)
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the largest accepted frame payload, in bytes.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> u32 {
        self.max_frame_bytes
    }

    /// Returns a copy with a different log filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Returns a copy with a different log format.
    #[must_use]
    pub const fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Returns a copy with a different frame size limit.
    #[must_use]
    pub const fn with_max_frame_bytes(mut self, limit: u32) -> Self {
        self.max_frame_bytes = limit;
        self
    }
}
