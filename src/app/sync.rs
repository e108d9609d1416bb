//! State synchronizer: decides when local state goes out and when remote
//! commands come in.
//!
//! - **Local → remote**: on a read-request for the owned virtual pin,
//!   report the current level only if it differs from the level last
//!   reported (change-only notification).
//! - **Remote → local**: on a write for the owned virtual pin, drive the
//!   mapped GPIO.
//!
//! Everything else (other pins, missing or non-numeric arguments) is a
//! no-op.  The synchronizer never talks to the network itself; it hands
//! a [`Notification`] back to the dispatcher, which confirms delivery
//! with [`StateSynchronizer::confirm`].

use std::sync::Arc;

use log::{debug, warn};

use crate::error::{CommandError, Error};
use crate::pins::PinId;

use super::commands::{int_arg, CommandName, RemoteCommand, VIRTUAL_WRITE};
use super::ports::GpioPort;
use super::state::SharedHardware;

/// A pending "virtual write" to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub virtual_pin: PinId,
    pub level: bool,
}

impl Notification {
    /// The outbound command carrying this notification.
    pub fn to_command(self) -> RemoteCommand {
        let mut cmd = RemoteCommand {
            name: CommandName::new(),
            args: heapless::Vec::new(),
        };
        // Both fit: name is 2 bytes, two numeric args out of MAX_ARGS.
        let _ = cmd.name.push_str(VIRTUAL_WRITE);
        let _ = cmd.args.push(int_arg(i32::from(self.virtual_pin)));
        let _ = cmd.args.push(int_arg(i32::from(self.level)));
        cmd
    }
}

/// Binds one virtual pin to one GPIO in the shared store.
pub struct StateSynchronizer<G: GpioPort> {
    hw: Arc<SharedHardware<G>>,
    virtual_pin: PinId,
    gpio: PinId,
}

impl<G: GpioPort> StateSynchronizer<G> {
    pub fn new(hw: Arc<SharedHardware<G>>, virtual_pin: PinId, gpio: PinId) -> Self {
        Self {
            hw,
            virtual_pin,
            gpio,
        }
    }

    pub fn virtual_pin(&self) -> PinId {
        self.virtual_pin
    }

    /// Handle a read-request.  Returns the notification to send, if the
    /// request names our pin and the level changed since the last one
    /// delivered.
    pub fn on_read_request(&self, cmd: &RemoteCommand) -> Option<Notification> {
        if let Err(e) = cmd.require_args(1) {
            warn!("sync: dropping '{}': {}", cmd.name, e);
            return None;
        }
        if !self.is_ours(cmd.arg(0)?) {
            return None;
        }

        let record = match self.hw.record(self.gpio) {
            Ok(r) => r,
            Err(e) => {
                warn!("sync: {}", e);
                return None;
            }
        };
        if record.current == record.notified {
            debug!("sync: V{} unchanged, nothing to send", self.virtual_pin);
            return None;
        }
        Some(Notification {
            virtual_pin: self.virtual_pin,
            level: record.current,
        })
    }

    /// Record a notification as delivered.
    pub fn confirm(&self, sent: Notification) {
        if let Err(e) = self.hw.mark_notified(self.gpio, sent.level) {
            warn!("sync: {}", e);
        }
    }

    /// Handle a write command.  Returns `true` if the pin was driven.
    pub fn on_write(&self, cmd: &RemoteCommand) -> bool {
        match self.parse_write(cmd) {
            Ok(Some(level)) => match self.hw.write(self.gpio, level) {
                Ok(()) => true,
                Err(e) => {
                    warn!("sync: {}", e);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!("sync: dropping '{}': {}", cmd.name, Error::from(e));
                false
            }
        }
    }

    /// `Ok(None)` for another pin; `Err` for a malformed command.
    fn parse_write(&self, cmd: &RemoteCommand) -> Result<Option<bool>, CommandError> {
        cmd.require_args(2)?;
        let pin = cmd.arg(0).unwrap_or_default();
        let value = cmd.arg(1).unwrap_or_default();

        let pin: PinId = pin.trim().parse().map_err(|_| CommandError::BadPin)?;
        if pin != self.virtual_pin {
            return Ok(None);
        }
        let value: i32 = value.trim().parse().map_err(|_| CommandError::BadValue)?;
        Ok(Some(value != 0))
    }

    fn is_ours(&self, pin_arg: &str) -> bool {
        pin_arg.trim().parse::<PinId>() == Ok(self.virtual_pin)
    }
}
