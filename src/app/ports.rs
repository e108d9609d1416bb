//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ app core (store, dispatcher, supervisor)
//! ```
//!
//! Driven adapters (GPIO, WiFi, protocol client) implement these traits.
//! The domain core consumes them via generics, so it never touches
//! hardware or sockets directly and runs unchanged on the host in tests.

use crate::config::RemoteOptions;
use crate::error::CommsError;
use crate::pins::PinId;

use super::commands::{ClientEvent, MessageKind};

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain ↔ pins)
// ───────────────────────────────────────────────────────────────

/// Digital level access for already-configured pins.
pub trait GpioPort {
    /// Current electrical level (`true` = high).
    fn read_level(&mut self, pin: PinId) -> bool;

    /// Drive an output pin.
    fn write_level(&mut self, pin: PinId, high: bool);
}

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: supervisor → network driver)
// ───────────────────────────────────────────────────────────────

/// Network-level operations the connectivity supervisor drives.
///
/// Results arrive asynchronously as [`LinkEvent`](crate::fsm::LinkEvent)s;
/// an `Ok` return only means the request was accepted.
pub trait NetworkPort {
    /// Ask the driver to associate with the configured access point.
    fn connect(&mut self) -> Result<(), CommsError>;

    /// Whether the station should connect as soon as it starts.
    fn auto_connect(&self) -> bool;

    /// Secondary bring-up once associated (IPv6 link-local address).
    fn enable_link_local(&mut self) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Protocol client port (driven adapter: domain ↔ remote transport)
// ───────────────────────────────────────────────────────────────

/// Sink the protocol client pushes inbound traffic into.
pub trait ClientEventSink: Sync {
    /// Deliver one inbound event.  Must not block; returns `false` if the
    /// event was dropped.
    fn deliver(&self, event: ClientEvent) -> bool;
}

/// The remote-protocol client.  Owns framing, transport, heartbeats and
/// its own socket reconnects; the firmware owns command policy.
pub trait ProtocolClient {
    /// Token, server address and timeouts.  Call before [`start`](Self::start).
    fn set_options(&mut self, options: &RemoteOptions);

    /// Route inbound hardware commands and session state changes.
    fn attach(&mut self, sink: &'static dyn ClientEventSink);

    /// Queue one message.  Must fail fast rather than block.
    fn send(&mut self, kind: MessageKind, channel_id: u16, body: &[u8]) -> Result<(), CommsError>;

    /// Start the client's own connection task.
    fn start(&mut self) -> Result<(), CommsError>;
}
