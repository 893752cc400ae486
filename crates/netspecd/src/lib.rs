//! Reference daemon for the netspec control protocol.
//!
//! `netspecd` is started by a controller with `--netspec <fd>` (or
//! `--netspec -` for standard input and output). It serves the phases in
//! [`phases`] until one of them ends the session, then exits with the
//! session's outcome. Logs go to standard error.

mod launch;
pub mod phases;

pub use self::launch::{LaunchError, launch, run};
pub use self::phases::{DaemonState, SharedState};
