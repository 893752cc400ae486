//! Control channel selection and setup.
//!
//! A daemon learns which descriptor carries the control protocol from a
//! `--netspec <fd>` (or `--netspec=<fd>`) argument. The argument is removed
//! before ordinary option parsing so the daemon's own CLI never sees it.
//! The value `-` selects standard input and output.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Command-line flag naming the control channel.
pub const NETSPEC_FLAG: &str = "--netspec";

const STDIO_VALUE: &str = "-";
const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Errors raised while locating or opening the control channel.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// `--netspec` was the last argument.
    #[error("--netspec requires a file descriptor or '-'")]
    MissingValue,

    /// `--netspec` appeared more than once.
    #[error("--netspec given more than once")]
    Repeated,

    /// The value was neither `-` nor a non-negative integer.
    #[error("invalid --netspec value '{value}': expected a file descriptor or '-'")]
    InvalidDescriptor {
        /// The rejected value.
        value: String,
    },

    /// The descriptor is not open in this process.
    #[error("file descriptor {fd} is not open")]
    NotOpen {
        /// The requested descriptor.
        fd: i32,
    },

    /// The descriptor is standard input, output or error.
    #[error("file descriptor {fd} is a standard stream; use --netspec - instead")]
    StandardStream {
        /// The requested descriptor.
        fd: i32,
    },

    /// Descriptor channels are not available on this platform.
    #[error("file descriptor channels are not supported on this platform")]
    Unsupported,

    /// The descriptor could not be prepared for use.
    #[error("failed to open channel on file descriptor {fd}: {source}")]
    Io {
        /// The requested descriptor.
        fd: i32,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

/// Where the control protocol runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSpec {
    /// Standard input for requests, standard output for acknowledgements.
    Stdio,
    /// One inherited descriptor used in both directions.
    Descriptor(i32),
}

impl fmt::Display for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str(STDIO_VALUE),
            Self::Descriptor(fd) => write!(f, "{fd}"),
        }
    }
}

impl FromStr for ChannelSpec {
    type Err = ChannelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == STDIO_VALUE {
            return Ok(Self::Stdio);
        }
        match value.parse::<i32>() {
            Ok(fd) if fd >= 0 => Ok(Self::Descriptor(fd)),
            _ => Err(ChannelError::InvalidDescriptor {
                value: value.to_owned(),
            }),
        }
    }
}

/// Removes the `--netspec` argument from `args`.
///
/// Returns the selected channel, if any, and the remaining arguments in their
/// original order. Arguments after a bare `--` are passed through untouched.
///
/// # Errors
///
/// Returns [`ChannelError`] when the flag has no value, appears twice, or
/// carries a value that is not a descriptor.
///
/// # Example
///
/// ```
/// use netspec::channel::{ChannelSpec, split_netspec_args};
///
/// let (channel, rest) = split_netspec_args(["netspecd", "--netspec", "3", "--log-format=compact"])
///     .expect("valid arguments");
/// assert_eq!(channel, Some(ChannelSpec::Descriptor(3)));
/// assert_eq!(rest, ["netspecd", "--log-format=compact"]);
/// ```
pub fn split_netspec_args<I, S>(
    args: I,
) -> Result<(Option<ChannelSpec>, Vec<OsString>), ChannelError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut channel = None;
    let mut rest = Vec::new();
    let mut args = args.into_iter().map(Into::into);

    while let Some(arg) = args.next() {
        if arg == "--" {
            rest.push(arg);
            rest.extend(args.by_ref());
            break;
        }
        let value = if arg == NETSPEC_FLAG {
            args.next().ok_or(ChannelError::MissingValue)?
        } else if let Some(value) = inline_value(&arg) {
            value
        } else {
            rest.push(arg);
            continue;
        };
        if channel.is_some() {
            return Err(ChannelError::Repeated);
        }
        channel = Some(parse_spec(&value)?);
    }

    Ok((channel, rest))
}

fn inline_value(arg: &OsStr) -> Option<OsString> {
    let text = arg.to_str()?;
    text.strip_prefix(NETSPEC_FLAG)?
        .strip_prefix('=')
        .map(OsString::from)
}

fn parse_spec(value: &OsStr) -> Result<ChannelSpec, ChannelError> {
    value.to_str().map_or_else(
        || {
            Err(ChannelError::InvalidDescriptor {
                value: value.to_string_lossy().into_owned(),
            })
        },
        str::parse,
    )
}

/// An open control channel.
pub struct Channel {
    spec: ChannelSpec,
    reader: Box<dyn Read>,
    writer: Box<dyn Write>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Opens the channel named by `spec`.
    ///
    /// For a descriptor, the channel takes ownership of it and closes it on
    /// drop; the writer half is a duplicate of the same descriptor. Both are
    /// marked close-on-exec so commands run by phases do not hold the channel
    /// open. Standard streams are only reachable through
    /// [`ChannelSpec::Stdio`].
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] if the descriptor is a standard stream, is not
    /// open, or cannot be duplicated.
    pub fn open(spec: ChannelSpec) -> Result<Self, ChannelError> {
        let (reader, writer): (Box<dyn Read>, Box<dyn Write>) = match spec {
            ChannelSpec::Stdio => (Box::new(io::stdin().lock()), Box::new(io::stdout())),
            ChannelSpec::Descriptor(fd) => {
                let (reader, writer) = descriptor::open(fd)?;
                (Box::new(reader), Box::new(writer))
            }
        };
        debug!(target: CHANNEL_TARGET, channel = %spec, "control channel open");
        Ok(Self {
            spec,
            reader,
            writer,
        })
    }

    /// Returns the channel this was opened from.
    #[must_use]
    pub const fn spec(&self) -> ChannelSpec {
        self.spec
    }

    /// Splits the channel into its reading and writing halves.
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn Read>, Box<dyn Write>) {
        (self.reader, self.writer)
    }
}

#[cfg(unix)]
mod descriptor {
    use std::fs::File;
    use std::io;
    use std::os::fd::{FromRawFd, OwnedFd, RawFd};
    use std::sync::Arc;

    use nix::errno::Errno;
    use nix::fcntl::{FcntlArg, FdFlag, fcntl};

    use super::ChannelError;

    const FIRST_NON_STANDARD_FD: RawFd = 3;

    /// Takes ownership of `fd`, returning it and a duplicate for writing.
    pub(super) fn open(fd: RawFd) -> Result<(File, File), ChannelError> {
        if fd < FIRST_NON_STANDARD_FD {
            return Err(ChannelError::StandardStream { fd });
        }
        let current = fcntl(fd, FcntlArg::F_GETFD).map_err(|errno| match errno {
            Errno::EBADF => ChannelError::NotOpen { fd },
            other => sys_error(fd, other),
        })?;
        let flags = FdFlag::from_bits_truncate(current) | FdFlag::FD_CLOEXEC;
        fcntl(fd, FcntlArg::F_SETFD(flags)).map_err(|errno| sys_error(fd, errno))?;
        let copy = fcntl(fd, FcntlArg::F_DUPFD_CLOEXEC(FIRST_NON_STANDARD_FD))
            .map_err(|errno| sys_error(fd, errno))?;

        // SAFETY: `fd` is open, is not a standard stream and was handed to
        // this process for the control channel. `copy` was just returned by
        // the kernel. Each descriptor is owned exactly once from here on.
        let (reader, writer) = unsafe { (OwnedFd::from_raw_fd(fd), OwnedFd::from_raw_fd(copy)) };
        Ok((File::from(reader), File::from(writer)))
    }

    fn sys_error(fd: RawFd, errno: Errno) -> ChannelError {
        ChannelError::Io {
            fd,
            source: Arc::new(io::Error::from(errno)),
        }
    }
}

#[cfg(not(unix))]
mod descriptor {
    use std::fs::File;

    use super::ChannelError;

    pub(super) const fn open(_fd: i32) -> Result<(File, File), ChannelError> {
        Err(ChannelError::Unsupported)
    }
}
