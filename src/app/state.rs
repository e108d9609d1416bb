//! Hardware state store.
//!
//! Authoritative current / previously-notified value of every controlled
//! output.  The edge-consumer task (toggle) and the remote-session task
//! (remote write, notification bookkeeping) both reach it, so every
//! access goes through [`SharedHardware`], which serializes them behind
//! one mutex.  Each public operation is a single lock step: readers never
//! see a half-updated record.

use std::sync::{Mutex, MutexGuard, PoisonError};

use heapless::FnvIndexMap;
use log::debug;

use crate::error::PinError;
use crate::pins::PinId;

use super::ports::GpioPort;

/// Outputs the store can track.  Power of two (index map requirement).
pub const MAX_PINS: usize = 4;

/// Per-pin record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinRecord {
    /// Level currently driven on the pin.
    pub current: bool,
    /// Level the remote peer was last told about.
    pub notified: bool,
}

/// The store itself.  Not shared directly; wrap it in [`SharedHardware`].
pub struct HardwareState<G: GpioPort> {
    gpio: G,
    pins: FnvIndexMap<PinId, PinRecord, MAX_PINS>,
}

impl<G: GpioPort> HardwareState<G> {
    /// Take ownership of `outputs` and drive each one low.
    pub fn new(mut gpio: G, outputs: &[PinId]) -> Result<Self, PinError> {
        let mut pins = FnvIndexMap::new();
        for &pin in outputs {
            gpio.write_level(pin, false);
            pins.insert(pin, PinRecord::default())
                .map_err(|_| PinError::TableFull)?;
        }
        Ok(Self { gpio, pins })
    }

    /// Flip the pin and return the new level.
    pub fn toggle(&mut self, pin: PinId) -> Result<bool, PinError> {
        let record = self.pins.get_mut(&pin).ok_or(PinError::Unknown(pin))?;
        record.current = !record.current;
        let level = record.current;
        self.gpio.write_level(pin, level);
        debug!("state: GPIO{} toggled -> {}", pin, u8::from(level));
        Ok(level)
    }

    /// Current level.
    pub fn read(&self, pin: PinId) -> Result<bool, PinError> {
        self.record(pin).map(|r| r.current)
    }

    /// Set the level directly.
    pub fn write(&mut self, pin: PinId, level: bool) -> Result<(), PinError> {
        let record = self.pins.get_mut(&pin).ok_or(PinError::Unknown(pin))?;
        record.current = level;
        self.gpio.write_level(pin, level);
        debug!("state: GPIO{} written -> {}", pin, u8::from(level));
        Ok(())
    }

    /// Both values of a pin, read together.
    pub fn record(&self, pin: PinId) -> Result<PinRecord, PinError> {
        self.pins.get(&pin).copied().ok_or(PinError::Unknown(pin))
    }

    /// Record that the peer now knows `level`.
    pub fn mark_notified(&mut self, pin: PinId, level: bool) -> Result<(), PinError> {
        let record = self.pins.get_mut(&pin).ok_or(PinError::Unknown(pin))?;
        record.notified = level;
        Ok(())
    }
}

/// Mutex-serialized handle shared by the tasks that touch the store.
pub struct SharedHardware<G: GpioPort> {
    inner: Mutex<HardwareState<G>>,
}

impl<G: GpioPort> SharedHardware<G> {
    pub fn new(state: HardwareState<G>) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Run `f` with exclusive access to the store.
    pub fn with<R>(&self, f: impl FnOnce(&mut HardwareState<G>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn toggle(&self, pin: PinId) -> Result<bool, PinError> {
        self.lock().toggle(pin)
    }

    pub fn read(&self, pin: PinId) -> Result<bool, PinError> {
        self.lock().read(pin)
    }

    pub fn write(&self, pin: PinId, level: bool) -> Result<(), PinError> {
        self.lock().write(pin, level)
    }

    pub fn record(&self, pin: PinId) -> Result<PinRecord, PinError> {
        self.lock().record(pin)
    }

    pub fn mark_notified(&self, pin: PinId, level: bool) -> Result<(), PinError> {
        self.lock().mark_notified(pin, level)
    }

    // A panic while holding the lock cannot leave a record half-written
    // (every mutation is a single field store), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HardwareState<G>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
