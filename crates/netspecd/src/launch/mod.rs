//! Daemon start-up and the top-level session loop.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use netspec::{
    Channel, ChannelError, Engine, EngineError, PhaseRegistry, RegistryError, TelemetryError,
    Termination, split_netspec_args, telemetry,
};
use netspec_config::{Config, ConfigError};
use thiserror::Error;
use tracing::{error, info};

use crate::phases::{self, SharedState};

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Errors that stop the daemon before or during a session.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The `--netspec` argument was malformed or the channel could not be
    /// opened.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// No control channel was given.
    #[error("no control channel: pass --netspec <fd> or --netspec -")]
    MissingChannel,

    /// Settings could not be resolved.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Logging could not be set up.
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),

    /// A phase could not be registered.
    #[error("failed to register phases: {0}")]
    Registry(#[from] RegistryError),

    /// The session ended without an acknowledgement.
    #[error("control session failed: {0}")]
    Engine(#[from] EngineError),
}

/// Starts the daemon and serves one control session.
///
/// # Errors
///
/// Returns [`LaunchError`] if start-up fails or the session ends without an
/// acknowledgement.
pub fn launch<I>(args: I) -> Result<Termination, LaunchError>
where
    I: IntoIterator<Item = OsString>,
{
    let (channel, rest) = split_netspec_args(args)?;
    let config = Config::load_from_iter(rest)?;
    let channel = channel.ok_or(LaunchError::MissingChannel)?;
    telemetry::initialise(&config)?;

    let mut registry = PhaseRegistry::new();
    phases::register(&mut registry, &SharedState::default())?;

    let (reader, writer) = Channel::open(channel)?.into_parts();
    info!(
        target: LAUNCH_TARGET,
        %channel,
        phases = registry.len(),
        max_frame_bytes = config.max_frame_bytes(),
        "daemon ready"
    );
    let mut engine =
        Engine::new(registry, reader, writer).with_max_frame_bytes(config.max_frame_bytes());
    engine.run().map_err(|source| {
        error!(target: LAUNCH_TARGET, error = %source, "control session failed");
        LaunchError::Engine(source)
    })
}

/// Runs the daemon and maps the outcome to an exit code.
///
/// Start-up errors are written to `stderr`. Help and version requests exit
/// successfully.
pub fn run<I, E>(args: I, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    E: Write,
{
    match launch(args) {
        Ok(termination) => termination.exit_code(),
        Err(LaunchError::Configuration(error)) if error.is_informational() => {
            write!(stderr, "{error}").ok();
            ExitCode::SUCCESS
        }
        Err(error) => {
            writeln!(stderr, "netspecd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
