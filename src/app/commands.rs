//! Remote commands exchanged with the peer.
//!
//! A hardware message body is a NUL-separated list of strings: the
//! command name followed by its arguments, e.g. `vw\022\01` ("virtual
//! write, pin 22, value 1").  Framing around the body belongs to the
//! protocol client.

use core::fmt::Write as _;

use heapless::{String, Vec};

use crate::error::{CommandError, CommsError};

/// Longest command name kept.
pub const MAX_NAME_LEN: usize = 8;
/// Longest single argument kept.
pub const MAX_ARG_LEN: usize = 32;
/// Most arguments kept per command.
pub const MAX_ARGS: usize = 8;
/// Largest encoded body.
pub const MAX_BODY_LEN: usize = 128;

pub type CommandName = String<MAX_NAME_LEN>;
pub type Arg = String<MAX_ARG_LEN>;
pub type Body = Vec<u8, MAX_BODY_LEN>;

/// Command name the peer uses to write a virtual pin.
pub const VIRTUAL_WRITE: &str = "vw";
/// Command name the peer uses to request a virtual pin's value.
pub const VIRTUAL_READ: &str = "vr";

/// Protocol message kinds the firmware sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Hardware command (virtual pin traffic).
    Hardware = 20,
}

/// One inbound command, parsed from a single message and dropped after
/// dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub name: CommandName,
    pub args: Vec<Arg, MAX_ARGS>,
}

impl RemoteCommand {
    /// Build a command from a name and string arguments.
    pub fn new(name: &str, args: &[&str]) -> Result<Self, CommandError> {
        let mut cmd = Self {
            name: field(name)?,
            args: Vec::new(),
        };
        for arg in args {
            cmd.args
                .push(field(arg)?)
                .map_err(|_| CommandError::TooManyArgs)?;
        }
        Ok(cmd)
    }

    /// Parse a NUL-separated hardware message body.
    ///
    /// A single trailing NUL is tolerated.  Bodies longer than
    /// [`MAX_BODY_LEN`] are rejected, so anything parsed re-encodes.
    pub fn parse(body: &[u8]) -> Result<Self, CommandError> {
        let body = body.strip_suffix(&[0]).unwrap_or(body);
        if body.is_empty() {
            return Err(CommandError::Empty);
        }
        if body.len() > MAX_BODY_LEN {
            return Err(CommandError::TooLong);
        }
        let text = core::str::from_utf8(body).map_err(|_| CommandError::NotUtf8)?;

        let mut parts = text.split('\0');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(CommandError::Empty);
        }
        let mut cmd = Self {
            name: field(name)?,
            args: Vec::new(),
        };
        for part in parts {
            cmd.args
                .push(field(part)?)
                .map_err(|_| CommandError::TooManyArgs)?;
        }
        Ok(cmd)
    }

    /// Encode as a NUL-separated body (no trailing NUL).
    pub fn encode(&self) -> Result<Body, CommsError> {
        let mut out = Body::new();
        out.extend_from_slice(self.name.as_bytes())
            .map_err(|_| CommsError::Overflow)?;
        for arg in &self.args {
            out.push(0).map_err(|_| CommsError::Overflow)?;
            out.extend_from_slice(arg.as_bytes())
                .map_err(|_| CommsError::Overflow)?;
        }
        Ok(out)
    }

    /// Argument `idx` as a string slice.
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }

    /// Fail unless at least `expected` arguments are present.
    pub fn require_args(&self, expected: usize) -> Result<(), CommandError> {
        if self.args.len() < expected {
            return Err(CommandError::MissingArgs {
                expected,
                got: self.args.len(),
            });
        }
        Ok(())
    }
}

/// Render a number as a command argument.
pub fn int_arg(value: i32) -> Arg {
    let mut s = Arg::new();
    // An i32 is at most 11 bytes; cannot overflow MAX_ARG_LEN.
    let _ = write!(s, "{value}");
    s
}

fn field<const N: usize>(s: &str) -> Result<String<N>, CommandError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| CommandError::FieldTooLong)?;
    Ok(out)
}

/// Remote session lifecycle reported by the protocol client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake completed; commands may flow.
    Authenticated,
    /// The session dropped (socket closed, auth rejected, heartbeat lost).
    Closed,
}

/// Everything the protocol client delivers to the firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Command(RemoteCommand),
    Session(SessionState),
}
