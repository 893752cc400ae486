//! Entry point for the `netspecd` daemon.
//!
//! The binary delegates to [`netspecd::run`], which strips the `--netspec`
//! argument, loads settings, and serves the control session.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    netspecd::run(std::env::args_os(), &mut stderr)
}
