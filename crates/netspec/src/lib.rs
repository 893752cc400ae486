//! Phase-dispatch control protocol.
//!
//! A controller drives a daemon through a sequence of named phases over a
//! bidirectional byte channel. Each request names a phase and carries
//! parameters; the daemon validates the parameters against the phase's
//! [`configspec::Spec`], runs the phase handler, and sends exactly one
//! acknowledgement before reading the next request. The acknowledgement code
//! also decides whether the daemon keeps serving.
//!
//! # Architecture
//!
//! - [`frame`] reads and writes `[u32 little-endian length][payload]` frames.
//! - [`protocol`] maps payloads to [`Request`] and [`Acknowledgement`].
//! - [`registry`] holds the phase table, including the built-in
//!   [`QUERY_PHASE`].
//! - [`engine`] runs the request/acknowledge loop and reports how the session
//!   ended as a [`Termination`].
//! - [`channel`] strips the `--netspec <fd>` argument and opens the channel.
//! - [`client`] is the controller half, used by tests and Rust controllers.
//! - [`telemetry`] installs structured logging on standard error.
//!
//! # Example
//!
//! ```rust
//! use configfile::{parse, parse_value};
//! use netspec::{AckCode, Controller, Engine, PhaseRegistry, Termination};
//!
//! let mut registry = PhaseRegistry::new();
//! let spec = parse_value(
//!     "{ type = dictionary, dictionary_keys = { commands = { type = list } } }",
//! )
//! .expect("spec parses");
//! registry
//!     .register_fn("exec", Some(spec), "Runs commands.", |_params, ack| {
//!         ack.exit_ok()?;
//!         Ok(())
//!     })
//!     .expect("registration succeeds");
//!
//! let mut controller = Controller::new(std::io::empty(), Vec::new());
//! controller
//!     .send("exec", parse(r#"commands = ["echo hi"]"#).expect("params parse"))
//!     .expect("request written");
//! let (_, requests) = controller.into_parts();
//!
//! let mut engine = Engine::new(registry, requests.as_slice(), Vec::new());
//! assert_eq!(engine.run().expect("session completes"), Termination::Success);
//!
//! let (_, _, replies) = engine.into_parts();
//! let mut controller = Controller::new(replies.as_slice(), std::io::sink());
//! assert_eq!(controller.read_ack().expect("acknowledged").code(), AckCode::OkExit);
//! ```

pub mod channel;
pub mod client;
pub mod engine;
pub mod frame;
pub mod protocol;
pub mod registry;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::channel::{Channel, ChannelError, ChannelSpec, NETSPEC_FLAG, split_netspec_args};
pub use self::client::{ClientError, Controller};
pub use self::engine::{AckError, Acknowledger, Engine, EngineError, Flow, Termination};
pub use self::frame::FrameError;
pub use self::protocol::{AckCode, Acknowledgement, ProtocolError, Request};
pub use self::registry::{
    Phase, PhaseError, PhaseHandler, PhaseRegistry, QUERY_PHASE, RegistryError,
};
pub use self::telemetry::{TelemetryError, TelemetryHandle};
