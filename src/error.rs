//! Unified error types for the PinSync firmware.
//!
//! A single `Error` enum that every subsystem can convert into.  All
//! variants are `Copy` so they can be passed between tasks and logged
//! without allocation.
//!
//! Only startup failures (`Config`) ever leave their component:
//! link errors are retried by the supervisor, malformed commands are
//! dropped by the dispatcher, and handoff-queue overflow is counted.

use core::fmt;

use crate::pins::PinId;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid.
    Config(&'static str),
    /// A hardware state store operation failed.
    Pin(PinError),
    /// Network or remote-session failure.
    Comms(CommsError),
    /// An inbound remote command could not be used.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Pin(e) => write!(f, "pin: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Pin errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// The pin is not managed by the state store.
    Unknown(PinId),
    /// The fixed-capacity pin table has no free slot.
    TableFull,
}

impl fmt::Display for PinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(pin) => write!(f, "GPIO{pin} is not managed"),
            Self::TableFull => write!(f, "pin table full"),
        }
    }
}

impl core::error::Error for PinError {}

impl From<PinError> for Error {
    fn from(e: PinError) -> Self {
        Self::Pin(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// No remote session is currently authenticated.
    NotAuthenticated,
    /// The protocol client refused or failed to queue the message.
    SendFailed,
    /// The outbound body does not fit the encode buffer.
    Overflow,
    /// The protocol client could not be started.
    StartFailed,
    /// The network driver rejected a connect request.
    ConnectFailed,
    /// Secondary bring-up (link-local address) failed.
    LinkLocalFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "session not authenticated"),
            Self::SendFailed => write!(f, "send failed"),
            Self::Overflow => write!(f, "message too large"),
            Self::StartFailed => write!(f, "protocol client start failed"),
            Self::ConnectFailed => write!(f, "WiFi connect failed"),
            Self::LinkLocalFailed => write!(f, "IPv6 link-local setup failed"),
        }
    }
}

impl core::error::Error for CommsError {}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The message body was empty.
    Empty,
    /// The body is not valid UTF-8.
    NotUtf8,
    /// The body exceeds the largest body the firmware handles.
    TooLong,
    /// More arguments than the parser keeps.
    TooManyArgs,
    /// A name or argument exceeds its fixed capacity.
    FieldTooLong,
    /// A handler needed more arguments than were supplied.
    MissingArgs { expected: usize, got: usize },
    /// The pin argument is not a number.
    BadPin,
    /// The value argument is not a number.
    BadValue,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty body"),
            Self::NotUtf8 => write!(f, "body is not UTF-8"),
            Self::TooLong => write!(f, "body too long"),
            Self::TooManyArgs => write!(f, "too many arguments"),
            Self::FieldTooLong => write!(f, "field too long"),
            Self::MissingArgs { expected, got } => {
                write!(f, "expected {expected} arguments, got {got}")
            }
            Self::BadPin => write!(f, "pin is not a number"),
            Self::BadValue => write!(f, "value is not a number"),
        }
    }
}

impl core::error::Error for CommandError {}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
