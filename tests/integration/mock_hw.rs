//! Mock adapters for integration tests.
//!
//! Each mock records what it was asked to do so tests can assert on the
//! full history without touching real GPIO registers or sockets.  Pin
//! levels live behind a shared handle so a test keeps visibility after
//! the mock has moved into the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use embedded_hal::delay::DelayNs;
use pinsync::app::commands::MessageKind;
use pinsync::app::ports::{ClientEventSink, GpioPort, NetworkPort, ProtocolClient};
use pinsync::config::RemoteOptions;
use pinsync::error::CommsError;
use pinsync::pins::PinId;

// ── GPIO ──────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockGpio {
    levels: Arc<Mutex<HashMap<PinId, bool>>>,
    writes: Arc<Mutex<Vec<(PinId, bool)>>>,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force an input level (as if the button moved).
    pub fn set_input(&self, pin: PinId, high: bool) {
        self.levels.lock().unwrap().insert(pin, high);
    }

    /// Electrical level of `pin`; undriven inputs idle high (pull-up).
    pub fn level(&self, pin: PinId) -> bool {
        self.levels.lock().unwrap().get(&pin).copied().unwrap_or(true)
    }

    pub fn writes(&self) -> Vec<(PinId, bool)> {
        self.writes.lock().unwrap().clone()
    }
}

impl GpioPort for MockGpio {
    fn read_level(&mut self, pin: PinId) -> bool {
        self.level(pin)
    }

    fn write_level(&mut self, pin: PinId, high: bool) {
        self.levels.lock().unwrap().insert(pin, high);
        self.writes.lock().unwrap().push((pin, high));
    }
}

// ── Network ───────────────────────────────────────────────────

pub struct MockNetwork {
    pub auto_connect: bool,
    pub connects: u32,
    pub link_local: u32,
    /// Reject every connect request.
    pub refuse: bool,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self {
            auto_connect: true,
            connects: 0,
            link_local: 0,
            refuse: false,
        }
    }
}

impl NetworkPort for MockNetwork {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.connects += 1;
        if self.refuse {
            return Err(CommsError::ConnectFailed);
        }
        Ok(())
    }

    fn auto_connect(&self) -> bool {
        self.auto_connect
    }

    fn enable_link_local(&mut self) -> Result<(), CommsError> {
        self.link_local += 1;
        Ok(())
    }
}

// ── Protocol client ───────────────────────────────────────────

#[derive(Default)]
pub struct MockClient {
    pub sent: Vec<(MessageKind, u16, Vec<u8>)>,
    pub fail_sends: bool,
}

impl ProtocolClient for MockClient {
    fn set_options(&mut self, _options: &RemoteOptions) {}

    fn attach(&mut self, _sink: &'static dyn ClientEventSink) {}

    fn send(&mut self, kind: MessageKind, channel_id: u16, body: &[u8]) -> Result<(), CommsError> {
        if self.fail_sends {
            return Err(CommsError::SendFailed);
        }
        self.sent.push((kind, channel_id, body.to_vec()));
        Ok(())
    }

    fn start(&mut self) -> Result<(), CommsError> {
        Ok(())
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records requested delays instead of sleeping.
#[derive(Default)]
pub struct MockDelay {
    pub waits_ms: Vec<u32>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}
