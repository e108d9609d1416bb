//! Command dispatcher.
//!
//! Routes each inbound [`RemoteCommand`] by name to its handler.  Unknown
//! names are ignored.  Outbound traffic goes through [`CommandDispatcher::send`],
//! which refuses to queue anything unless the session is authenticated.

use std::sync::Arc;

use heapless::FnvIndexMap;
use log::{debug, warn};

use crate::error::CommsError;
use crate::fsm::LinkStatus;

use super::commands::{CommandName, MessageKind, RemoteCommand, VIRTUAL_READ, VIRTUAL_WRITE};
use super::ports::{GpioPort, ProtocolClient};
use super::sync::StateSynchronizer;

/// Registered command names.  Power of two (index map requirement).
pub const MAX_HANDLERS: usize = 4;

/// Channel id used for hardware messages.
pub const HARDWARE_CHANNEL: u16 = 0;

/// What to do with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Drive the bound output from the peer's value.
    VirtualWrite,
    /// Report the bound output if it changed.
    VirtualRead,
}

pub struct CommandDispatcher<C: ProtocolClient> {
    handlers: FnvIndexMap<CommandName, Handler, MAX_HANDLERS>,
    client: C,
    link: Arc<LinkStatus>,
}

impl<C: ProtocolClient> CommandDispatcher<C> {
    fn new(client: C, link: Arc<LinkStatus>) -> Self {
        Self {
            handlers: FnvIndexMap::new(),
            client,
            link,
        }
    }

    /// Registry with `vw` and `vr` bound.
    pub fn standard(client: C, link: Arc<LinkStatus>) -> Self {
        let mut d = Self::new(client, link);
        // Two entries into a table of MAX_HANDLERS.
        let _ = d.register(VIRTUAL_WRITE, Handler::VirtualWrite);
        let _ = d.register(VIRTUAL_READ, Handler::VirtualRead);
        d
    }

    /// Bindings are fixed once `standard` returns.
    fn register(&mut self, name: &str, handler: Handler) -> Result<(), CommsError> {
        let mut key = CommandName::new();
        key.push_str(name).map_err(|_| CommsError::Overflow)?;
        self.handlers
            .insert(key, handler)
            .map_err(|_| CommsError::Overflow)?;
        Ok(())
    }

    pub fn handler(&self, name: &str) -> Option<Handler> {
        self.handlers
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, h)| *h)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// Run the handler for `cmd`.  Returns the handler used, if any.
    pub fn dispatch<G: GpioPort>(
        &mut self,
        cmd: &RemoteCommand,
        sync: &StateSynchronizer<G>,
    ) -> Option<Handler> {
        debug!("dispatch: '{}' {:?}", cmd.name, cmd.args);
        let Some(handler) = self.handlers.get(&cmd.name).copied() else {
            debug!("dispatch: no handler for '{}'", cmd.name);
            return None;
        };

        match handler {
            Handler::VirtualWrite => {
                sync.on_write(cmd);
            }
            Handler::VirtualRead => {
                if let Some(note) = sync.on_read_request(cmd) {
                    match self.send(&note.to_command()) {
                        Ok(()) => sync.confirm(note),
                        Err(e) => warn!("dispatch: V{} not reported: {}", note.virtual_pin, e),
                    }
                }
            }
        }
        Some(handler)
    }

    /// Queue one hardware message.  Fails fast when there is no session.
    pub fn send(&mut self, cmd: &RemoteCommand) -> Result<(), CommsError> {
        if !self.link.is_authenticated() {
            return Err(CommsError::NotAuthenticated);
        }
        let body = cmd.encode()?;
        self.client
            .send(MessageKind::Hardware, HARDWARE_CHANNEL, &body)
    }
}
