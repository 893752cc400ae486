//! Phases served by the reference daemon.
//!
//! | phase       | params                         | reply                              |
//! |-------------|--------------------------------|------------------------------------|
//! | `configure` | `settings`: dict of strings    | `OK`, settings echoed in `config`  |
//! | `status`    | none                           | `OK`, daemon state in `config`     |
//! | `exec`      | `commands`: list of strings    | `OK_EXIT`, or `ERROR` on failure   |
//! | `shutdown`  | none                           | `OK_EXIT`                          |

use std::cell::RefCell;
use std::process::Command;
use std::rc::Rc;

use configfile::{Dict, Value, parse_value};
use netspec::{
    AckCode, Acknowledgement, Acknowledger, PhaseError, PhaseHandler, PhaseRegistry, RegistryError,
};
use tracing::{debug, info, warn};

const PHASES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::phases");

const NO_PARAMS_SPEC: &str = "{ type = dictionary }";
const CONFIGURE_SPEC: &str = r#"{
    type = dictionary
    doc = "Settings stored by the daemon."
    dictionary_keys = {
        settings = { type = dictionary, dictionary_members = { type = string } }
    }
}"#;
const EXEC_SPEC: &str = r#"{
    type = dictionary
    doc = "Shell commands run in order."
    dictionary_keys = {
        commands = { type = list, list_members = { type = string } }
    }
}"#;

/// Mutable daemon state shared by the phase handlers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DaemonState {
    settings: Option<Dict>,
    commands_run: i32,
}

impl DaemonState {
    /// Returns the stored settings, if `configure` has run.
    #[must_use]
    pub const fn settings(&self) -> Option<&Dict> {
        self.settings.as_ref()
    }

    /// Returns how many commands `exec` has completed.
    #[must_use]
    pub const fn commands_run(&self) -> i32 {
        self.commands_run
    }

    fn summary(&self) -> Dict {
        let mut summary = Dict::new();
        summary.insert("configured".to_owned(), Value::Boolean(self.settings.is_some()));
        summary.insert("commands_run".to_owned(), Value::Int(self.commands_run));
        summary
    }
}

/// State handle shared between handlers.
pub type SharedState = Rc<RefCell<DaemonState>>;

/// Registers the daemon's phases against `state`.
///
/// # Errors
///
/// Returns [`RegistryError`] if a phase cannot be registered.
pub fn register(registry: &mut PhaseRegistry, state: &SharedState) -> Result<(), RegistryError> {
    registry.register(
        "configure",
        Some(spec("configure", CONFIGURE_SPEC)?),
        "Stores daemon settings and echoes them back.",
        Configure(Rc::clone(state)),
    )?;
    registry.register(
        "status",
        Some(spec("status", NO_PARAMS_SPEC)?),
        "Reports whether the daemon is configured and how many commands it has run.",
        Status(Rc::clone(state)),
    )?;
    registry.register(
        "exec",
        Some(spec("exec", EXEC_SPEC)?),
        "Runs shell commands in order and exits.",
        Exec(Rc::clone(state)),
    )?;
    registry.register_fn(
        "shutdown",
        Some(spec("shutdown", NO_PARAMS_SPEC)?),
        "Ends the session successfully.",
        |_params, ack| {
            info!(target: PHASES_TARGET, "shutdown requested");
            ack.exit_ok()?;
            Ok(())
        },
    )
}

fn spec(phase: &str, text: &str) -> Result<Value, RegistryError> {
    parse_value(text).map_err(|error| RegistryError::InvalidSpec {
        name: phase.to_owned(),
        source: error.into(),
    })
}

struct Configure(SharedState);

impl PhaseHandler for Configure {
    fn handle(&mut self, mut params: Dict, ack: &mut Acknowledger<'_>) -> Result<(), PhaseError> {
        let Some(Value::Dict(settings)) = params.remove("settings") else {
            return Err(PhaseError::failed("settings missing after validation"));
        };
        debug!(target: PHASES_TARGET, keys = settings.len(), "storing settings");
        self.0.borrow_mut().settings = Some(settings.clone());
        ack.send(Acknowledgement::new(AckCode::Ok).with_config(settings))?;
        Ok(())
    }
}

struct Status(SharedState);

impl PhaseHandler for Status {
    fn handle(&mut self, _params: Dict, ack: &mut Acknowledger<'_>) -> Result<(), PhaseError> {
        let summary = self.0.borrow().summary();
        ack.send(Acknowledgement::new(AckCode::Ok).with_config(summary))?;
        Ok(())
    }
}

struct Exec(SharedState);

impl PhaseHandler for Exec {
    fn handle(&mut self, params: Dict, ack: &mut Acknowledger<'_>) -> Result<(), PhaseError> {
        let commands = params
            .get("commands")
            .and_then(Value::as_string_list)
            .ok_or_else(|| PhaseError::failed("commands missing after validation"))?;

        let mut output = String::new();
        for command in commands {
            info!(target: PHASES_TARGET, command, "running command");
            let result = Command::new("sh")
                .arg("-c")
                .arg(command)
                .output()
                .map_err(|error| PhaseError::io(format!("failed to start '{command}'"), error))?;
            output.push_str(&String::from_utf8_lossy(&result.stdout));
            if !result.status.success() {
                warn!(target: PHASES_TARGET, command, status = %result.status, "command failed");
                let stderr = String::from_utf8_lossy(&result.stderr);
                ack.error(format!(
                    "command '{command}' failed ({}): {}",
                    result.status,
                    stderr.trim_end()
                ))?;
                return Ok(());
            }
            let mut state = self.0.borrow_mut();
            state.commands_run = state.commands_run.saturating_add(1);
        }

        ack.send(Acknowledgement::new(AckCode::OkExit).with_message(output))?;
        Ok(())
    }
}
