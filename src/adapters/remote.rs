//! Placeholder protocol client.
//!
//! The remote wire protocol (framing, heartbeats, socket reconnects) is
//! supplied by an external client crate implementing [`ProtocolClient`].
//! Until one is wired in, [`NullClient`] stands in: it accepts and
//! discards outbound messages, and lets the caller inject inbound events
//! the way a real client would from its own context.

use log::{debug, info, warn};

use crate::app::commands::{ClientEvent, MessageKind};
use crate::app::ports::{ClientEventSink, ProtocolClient};
use crate::config::RemoteOptions;
use crate::error::CommsError;

#[derive(Default)]
pub struct NullClient {
    options: Option<RemoteOptions>,
    sink: Option<&'static dyn ClientEventSink>,
    started: bool,
    sent: u32,
}

impl NullClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted by [`send`](ProtocolClient::send).
    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Push an inbound event into the attached sink.
    pub fn inject(&self, event: ClientEvent) -> bool {
        match self.sink {
            Some(sink) => sink.deliver(event),
            None => {
                warn!("remote(null): no sink attached, event dropped");
                false
            }
        }
    }
}

impl ProtocolClient for NullClient {
    fn set_options(&mut self, options: &RemoteOptions) {
        self.options = Some(options.clone());
    }

    fn attach(&mut self, sink: &'static dyn ClientEventSink) {
        self.sink = Some(sink);
    }

    fn send(&mut self, kind: MessageKind, channel_id: u16, body: &[u8]) -> Result<(), CommsError> {
        if !self.started {
            return Err(CommsError::SendFailed);
        }
        debug!("remote(null): {:?} ch={} {} bytes discarded", kind, channel_id, body.len());
        self.sent = self.sent.wrapping_add(1);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CommsError> {
        let Some(options) = &self.options else {
            return Err(CommsError::StartFailed);
        };
        info!("remote(null): started for {} (no transport)", options.server);
        self.started = true;
        Ok(())
    }
}
